//! # Scene Persistence: Encode and Decode Entity Trees
//!
//! A scene is lowered into plain serde data ([`SceneData`]) and rebuilt from
//! it. The core never picks a format: `SceneData` is `Serialize +
//! Deserialize`, so any serde format can carry it. JSON helpers are provided
//! because that is what the bundled examples use.
//!
//! ## Shape
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "name": "Player",
//!       "components": [
//!         { "type": "Transform", "value": { "translation": [0.0, 1.0, 0.0] } },
//!         { "type": "Health", "value": { "current": 80, "max": 100 } }
//!       ],
//!       "children": [
//!         { "name": "Sword", "components": [] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! - Only root entities appear at the top level; children nest below their
//!   parent in attach order.
//! - Components appear in type-token order, each tagged with its registered
//!   name. Field encoding is whatever the component's serde impl does.
//! - Transient entities and their subtrees are left out, as is anything
//!   pending destruction.
//! - A missing name means the entity is unnamed.
//!
//! ## Loading
//!
//! [`Scene::decode`] creates every entity inactive, attaches children, then
//! activates the new roots and refreshes. Loading is all-or-nothing: on the
//! first [`DecodeError`] every entity created by the call is discarded before
//! anyone has been told about it, and the error is returned.

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::ecs::registry;
use crate::ecs::{EntityHandle, Scene};
use crate::error::{DecodeError, Result, SceneError};

// ── Scene Data ──────────────────────────────────────────────────────────

/// A persisted scene: its root entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default)]
    pub entities: Vec<SceneEntity>,
}

/// One persisted entity and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<SceneComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneEntity>,
}

/// One persisted component, tagged with its registered type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneComponent {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl SceneData {
    pub fn from_json(json: &str) -> std::result::Result<Self, DecodeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| SceneError::Encode {
            component: "SceneData".into(),
            source,
        })
    }

    /// Number of entities in every subtree.
    pub fn entity_count(&self) -> usize {
        self.entities.iter().map(SceneEntity::entity_count).sum()
    }
}

impl SceneEntity {
    /// This entity plus all of its descendants.
    pub fn entity_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SceneEntity::entity_count)
            .sum::<usize>()
    }
}

// ── Encode ──────────────────────────────────────────────────────────────

impl Scene {
    /// Encode every live root entity that is neither transient nor pending
    /// destruction, in id order.
    pub fn encode(&self) -> Result<SceneData> {
        let mut entities = Vec::new();
        for entity in self.entities.iter() {
            if entity.parent().is_some() || !is_persistent(entity) {
                continue;
            }
            let handle = self.entities.handle_unchecked(entity);
            entities.push(self.encode_entity(handle)?);
        }
        Ok(SceneData { entities })
    }

    /// Encode one entity and its persistent descendants. The entity itself is
    /// encoded even if it is transient.
    pub fn encode_entity(&self, handle: EntityHandle) -> Result<SceneEntity> {
        let entity = self.entities.get(handle)?;

        let mut components = Vec::new();
        for pool in self.pools.iter().flatten() {
            let Some(value) = pool.get_any(handle.id) else {
                continue;
            };
            let info = registry::info(pool.component_type()).ok_or_else(|| {
                SceneError::invalid(format!("Unregistered component type '{}'", pool.type_name()))
            })?;
            components.push(SceneComponent {
                type_name: info.name().to_string(),
                value: info.encode(value)?,
            });
        }

        let mut children = Vec::new();
        for &child in entity.children() {
            let child_entity = self.entities.with_id(child)?;
            if !is_persistent(child_entity) {
                continue;
            }
            children.push(self.encode_entity(self.entities.handle_unchecked(child_entity))?);
        }

        Ok(SceneEntity {
            name: (!entity.name().is_empty()).then(|| entity.name().to_string()),
            components,
            children,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        self.encode()?.to_json()
    }

    // ── Decode ──────────────────────────────────────────────────────────

    /// Create, activate and refresh every entity in `data`. Returns the new
    /// root handles in document order.
    pub fn decode(&mut self, data: &SceneData) -> Result<Vec<EntityHandle>> {
        let mut roots = Vec::with_capacity(data.entities.len());
        for entity in &data.entities {
            match self.decode_entity(entity) {
                Ok(root) => roots.push(root),
                Err(err) => {
                    error!("Scene decode failed, discarding {} decoded root(s): {err}", roots.len());
                    for root in roots {
                        self.discard_unannounced(root);
                    }
                    return Err(err);
                }
            }
        }

        for &root in &roots {
            self.activate(root)?;
        }
        self.refresh();
        debug!("Decoded {} entities", data.entity_count());
        Ok(roots)
    }

    /// Create an inactive entity tree from `data` without activating it.
    ///
    /// On failure nothing created by this call survives.
    pub fn decode_entity(&mut self, data: &SceneEntity) -> Result<EntityHandle> {
        let handle = self.create_entity(data.name.as_deref().unwrap_or(""));
        if let Err(err) = self.decode_into(handle, data) {
            self.discard_unannounced(handle);
            return Err(err);
        }
        Ok(handle)
    }

    fn decode_into(&mut self, handle: EntityHandle, data: &SceneEntity) -> Result<()> {
        for component in &data.components {
            let type_id = registry::type_id_of_name(&component.type_name)
                .ok_or_else(|| DecodeError::UnknownComponent(component.type_name.clone()))?;
            let info = registry::info(type_id)
                .ok_or_else(|| DecodeError::UnknownComponent(component.type_name.clone()))?;
            let duplicate = self
                .erased_pool(type_id)
                .is_some_and(|pool| pool.contains(handle.id));
            if duplicate {
                return Err(DecodeError::DuplicateComponent {
                    entity: data.name.clone().unwrap_or_default(),
                    component: component.type_name.clone(),
                }
                .into());
            }
            let value = info.decode(component.value.clone())?;
            self.insert_erased(handle, type_id, value)?;
        }

        for child in &data.children {
            let child = self.decode_entity(child)?;
            self.add_child(handle, child)?;
        }
        Ok(())
    }

    /// Parse `json` as [`SceneData`] and [`decode`](Scene::decode) it.
    pub fn load_json(&mut self, json: &str) -> Result<Vec<EntityHandle>> {
        let data = SceneData::from_json(json)?;
        self.decode(&data)
    }
}

fn is_persistent(entity: &crate::ecs::Entity) -> bool {
    !entity.is_transient() && !entity.is_pending_destruction()
}
