//! Scene diagnostics, enabled by the `diagnostics` feature.
//!
//! Every [`Scene::refresh`] records a [`RefreshStats`]; [`Scene::snapshot`]
//! gathers that together with pool and system occupancy into a
//! [`SceneSnapshot`] that serializes to JSON for logging or external tools.

use serde::Serialize;

use crate::ecs::Scene;
use crate::error::{Result, SceneError};

/// What the most recent refresh did, and the pool state it left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    /// `Create` events delivered.
    pub created: usize,
    pub activated: usize,
    /// Entities reclaimed, descendants included.
    pub destroyed: usize,
    pub live_entities: usize,
    pub active_entities: usize,
    /// Ids waiting in the free list for reuse.
    pub free_ids: usize,
    pub total_slots: usize,
}

// ── Snapshot types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    pub scene: u32,
    pub live_entities: usize,
    pub active_entities: usize,
    pub pools: Vec<PoolSnapshot>,
    pub systems: Vec<String>,
    pub entity_listeners: usize,
    pub last_refresh: RefreshStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub component: String,
    pub len: usize,
}

impl SceneSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| SceneError::Encode {
            component: "SceneSnapshot".into(),
            source,
        })
    }
}

impl Scene {
    /// Point-in-time summary of the scene. Pools appear in type-token order.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            scene: self.id.raw(),
            live_entities: self.entities.live_count(),
            active_entities: self.entities.activated_count(),
            pools: self
                .pools
                .iter()
                .flatten()
                .map(|pool| PoolSnapshot {
                    component: pool.type_name().to_string(),
                    len: pool.len(),
                })
                .collect(),
            systems: self.system_names().map(str::to_string).collect(),
            entity_listeners: self.entities.listener_count(),
            last_refresh: self.last_refresh.clone(),
        }
    }
}
