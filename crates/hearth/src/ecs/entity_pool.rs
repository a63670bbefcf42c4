//! # EntityPool: Entity Storage and Deferred Lifecycle Queues
//!
//! Entity records live in slots indexed by id. Each slot carries a generation
//! counter that is bumped when its entity is reclaimed, which is what makes
//! stale [`EntityHandle`]s detectable.
//!
//! Activation and destruction requests are queued here and drained by
//! [`Scene::refresh`](super::Scene::refresh), which also owns the component
//! pools those phases need to notify. Queueing is idempotent: the
//! `PENDING_*` flag on the record doubles as the "already queued" marker.

use std::cell::RefCell;
use std::rc::Rc;

use super::entity::{Entity, EntityEvent, EntityFlags, EntityId};
use super::handle::{EntityHandle, SceneId};
use super::id_pool::IdPool;
use crate::error::{Result, SceneError};
use crate::event::{EventDispatcher, EventListener};

#[derive(Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

pub struct EntityPool {
    scene: SceneId,
    ids: IdPool,
    slots: Vec<Slot>,
    pending_creation: Vec<EntityId>,
    pending_activation: Vec<EntityId>,
    pending_destruction: Vec<EntityId>,
    activated_count: usize,
    dispatcher: EventDispatcher<EntityEvent>,
}

impl EntityPool {
    pub(crate) fn new(scene: SceneId, capacity: usize) -> Self {
        Self {
            scene,
            ids: IdPool::new(),
            slots: Vec::with_capacity(capacity),
            pending_creation: Vec::new(),
            pending_activation: Vec::new(),
            pending_destruction: Vec::new(),
            activated_count: 0,
            dispatcher: EventDispatcher::new(),
        }
    }

    // ── Creation and lookup ─────────────────────────────────────────────

    /// Allocate an inactive entity. Its `Create` event goes out at the next
    /// refresh.
    pub(crate) fn create(&mut self, name: String) -> EntityHandle {
        let raw = self.ids.acquire();
        let index = raw as usize;
        if index == self.slots.len() {
            self.slots.push(Slot::default());
        }
        let slot = &mut self.slots[index];
        let id = EntityId(raw);
        slot.entity = Some(Entity::new(id, slot.generation, name));
        self.pending_creation.push(id);
        EntityHandle {
            scene: self.scene,
            id,
            generation: slot.generation,
        }
    }

    pub fn is_valid(&self, handle: EntityHandle) -> bool {
        handle.scene == self.scene && self.slot_entity(handle).is_some()
    }

    fn slot_entity(&self, handle: EntityHandle) -> Option<&Entity> {
        let slot = self.slots.get(handle.id.0 as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    fn check_scene(&self, handle: EntityHandle) -> Result<()> {
        if handle.scene != self.scene {
            return Err(SceneError::invalid("Entity belongs to another scene"));
        }
        Ok(())
    }

    /// Resolve a handle. Fails with `InvalidOperation` if it is stale or
    /// belongs to another scene.
    pub fn get(&self, handle: EntityHandle) -> Result<&Entity> {
        self.check_scene(handle)?;
        self.slot_entity(handle)
            .ok_or_else(|| SceneError::invalid("Invalid entity"))
    }

    pub(crate) fn get_mut(&mut self, handle: EntityHandle) -> Result<&mut Entity> {
        self.check_scene(handle)?;
        self.slots
            .get_mut(handle.id.0 as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entity.as_mut())
            .ok_or_else(|| SceneError::invalid("Invalid entity"))
    }

    /// Resolve a live id.
    pub fn with_id(&self, id: EntityId) -> Result<&Entity> {
        self.slots
            .get(id.0 as usize)
            .and_then(|slot| slot.entity.as_ref())
            .ok_or_else(|| SceneError::invalid(format!("No entity with id {id}")))
    }

    pub(crate) fn with_id_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.entity.as_mut())
    }

    /// Handle for the entity currently living under `id`.
    pub fn handle_of(&self, id: EntityId) -> Result<EntityHandle> {
        let entity = self.with_id(id)?;
        Ok(EntityHandle {
            scene: self.scene,
            id,
            generation: entity.generation,
        })
    }

    pub(crate) fn handle_unchecked(&self, entity: &Entity) -> EntityHandle {
        EntityHandle {
            scene: self.scene,
            id: entity.id,
            generation: entity.generation,
        }
    }

    // ── Deferred queues ─────────────────────────────────────────────────

    /// Queue `id` for activation. Returns `false` if it was already queued.
    pub(crate) fn enqueue_activation(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.with_id_mut(id) else {
            return false;
        };
        if entity.flags.contains(EntityFlags::PENDING_ACTIVATION) {
            return false;
        }
        entity.flags.insert(EntityFlags::PENDING_ACTIVATION);
        self.pending_activation.push(id);
        true
    }

    /// Queue `id` for destruction. Returns `false` if it was already queued.
    pub(crate) fn enqueue_destruction(&mut self, id: EntityId) -> bool {
        if !self.mark_pending_destruction(id) {
            return false;
        }
        self.pending_destruction.push(id);
        true
    }

    /// Flag `id` as pending destruction without queueing it. An activated
    /// entity stops counting as activated from here on; `announced` keeps
    /// track of the `Remove` events it is still owed.
    pub(crate) fn mark_pending_destruction(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.with_id_mut(id) else {
            return false;
        };
        if entity.flags.contains(EntityFlags::PENDING_DESTRUCTION) {
            return false;
        }
        entity.flags.insert(EntityFlags::PENDING_DESTRUCTION);
        let was_activated = entity.flags.contains(EntityFlags::ACTIVATED);
        entity.flags.remove(EntityFlags::ACTIVATED);
        if was_activated {
            self.activated_count -= 1;
        }
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_creation.is_empty()
            || !self.pending_activation.is_empty()
            || !self.pending_destruction.is_empty()
    }

    pub(crate) fn take_pending_creation(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_creation)
    }

    pub(crate) fn take_pending_activation(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_activation)
    }

    pub(crate) fn take_pending_destruction(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_destruction)
    }

    /// Drop `id` from the creation queue so no `Create` event is sent for it.
    pub(crate) fn forget_creation(&mut self, id: EntityId) {
        self.pending_creation.retain(|pending| *pending != id);
    }

    /// Flip a queued entity to activated. Returns `None` if `id` is no longer
    /// waiting for activation.
    ///
    /// An entity already queued for destruction is announced but never
    /// flagged `ACTIVATED`.
    pub(crate) fn complete_activation(&mut self, id: EntityId) -> Option<EntityHandle> {
        let entity = self.with_id_mut(id)?;
        if !entity.flags.contains(EntityFlags::PENDING_ACTIVATION) {
            return None;
        }
        entity.flags.remove(EntityFlags::PENDING_ACTIVATION);
        entity.announced = true;
        let generation = entity.generation;
        if !entity.flags.contains(EntityFlags::PENDING_DESTRUCTION) {
            entity.flags.insert(EntityFlags::ACTIVATED);
            self.activated_count += 1;
        }
        Some(EntityHandle {
            scene: self.scene,
            id,
            generation,
        })
    }

    /// Remove the record, invalidate every handle to it and return its id to
    /// the id pool.
    pub(crate) fn reclaim(&mut self, id: EntityId) -> Result<Entity> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .ok_or_else(|| SceneError::invalid(format!("No entity with id {id}")))?;
        let entity = slot
            .entity
            .take()
            .ok_or_else(|| SceneError::invalid(format!("No entity with id {id}")))?;
        slot.generation = slot.generation.wrapping_add(1);
        if entity.is_activated() {
            self.activated_count -= 1;
        }
        self.ids.release(id.0)?;
        Ok(entity)
    }

    // ── Iteration and statistics ────────────────────────────────────────

    /// Every live record in id order, activated or not.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(|slot| slot.entity.as_ref())
    }

    /// Activated records in id order.
    pub fn iter_activated(&self) -> impl Iterator<Item = &Entity> {
        self.iter().filter(|entity| entity.is_activated())
    }

    /// Number of activated entities.
    pub fn activated_count(&self) -> usize {
        self.activated_count
    }

    /// Number of live records, activated or not.
    pub fn live_count(&self) -> usize {
        self.ids.outstanding_count()
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn free_count(&self) -> usize {
        self.ids.free_count()
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn total_slots(&self) -> usize {
        self.slots.len()
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn register_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<EntityEvent> + 'static,
    {
        self.dispatcher.register_listener(listener)
    }

    pub fn unregister_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<EntityEvent> + 'static,
    {
        self.dispatcher.unregister_listener(listener)
    }

    /// Number of live entity event listeners.
    pub fn listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    pub(crate) fn dispatcher_mut(&mut self) -> &mut EventDispatcher<EntityEvent> {
        &mut self.dispatcher
    }
}
