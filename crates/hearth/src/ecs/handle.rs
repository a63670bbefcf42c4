//! # Handles: Weak References That Never Dangle
//!
//! Entity ids are recycled, so holding an [`EntityId`] across ticks is unsafe
//! in the logical sense: after the entity is destroyed, the same id may name a
//! brand new entity. An [`EntityHandle`] pairs the id with the slot's
//! **generation** and the owning scene:
//!
//! ```text
//! EntityHandle { scene: 1, id: 5, generation: 0 }  ← first occupant
//! EntityHandle { scene: 1, id: 5, generation: 1 }  ← entity that reused slot 5
//! ```
//!
//! The generation of a slot is bumped exactly once per reclamation, so every
//! copy of a handle flips from valid to invalid at the same instant and never
//! flips back. Resolving an invalid handle through the scene is an
//! `InvalidOperation` error.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use super::entity::EntityId;

/// Identifies a [`Scene`](super::Scene) for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

impl SceneId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Generation-checked reference to an entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub(crate) scene: SceneId,
    pub(crate) id: EntityId,
    pub(crate) generation: u32,
}

impl EntityHandle {
    pub fn id(self) -> EntityId {
        self.id
    }

    pub fn scene(self) -> SceneId {
        self.scene
    }

    /// Raw generation counter. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation)
    }
}

/// Reference to the `T` component of an entity.
///
/// Valid while the entity is alive and still holds a `T`.
pub struct ComponentHandle<T> {
    pub(crate) entity: EntityHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentHandle<T> {
    pub(crate) fn new(entity: EntityHandle) -> Self {
        Self {
            entity,
            _marker: PhantomData,
        }
    }

    pub fn entity(&self) -> EntityHandle {
        self.entity
    }
}

impl<T> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentHandle<T> {}

impl<T> PartialEq for ComponentHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<T> Eq for ComponentHandle<T> {}

impl<T> Hash for ComponentHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
    }
}

impl<T> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentHandle<{}>({:?})",
            crate::ecs::registry::short_type_name(std::any::type_name::<T>()),
            self.entity
        )
    }
}
