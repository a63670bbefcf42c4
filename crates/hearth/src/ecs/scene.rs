//! # Scene: Entities, Component Pools and the Refresh Point
//!
//! A [`Scene`] owns one [`EntityPool`], one [`ComponentPool<T>`] per component
//! type it has seen, and an ordered list of systems.
//!
//! ## Deferred structural changes
//!
//! Systems iterate entities and components while other systems (or they
//! themselves) create and destroy entities. To keep iteration coherent, the
//! two lifecycle changes that systems care about are deferred:
//!
//! - [`Scene::activate`] only queues the entity (and its subtree).
//! - [`Scene::destroy`] only queues the entity (and its subtree).
//!
//! [`Scene::refresh`] applies the queues:
//!
//! ```text
//! refresh()
//!   ├─ initialize systems added since the last refresh
//!   └─ until every queue is empty:
//!        ├─ Create events, in creation order
//!        ├─ activations, in queue order (children before parents)
//!        │    └─ Add per component (type-token order), then Activate
//!        └─ destructions, in queue order (children before parents)
//!             └─ Remove per component (type-token order), then Destroy,
//!                then the id is reclaimed and every handle goes stale
//! ```
//!
//! Adding or removing a component on an entity that is already activated is
//! not deferred: its event is dispatched before the call returns.
//!
//! ## Threading
//!
//! A scene is single-threaded. Listener cells are `Rc`, so `Scene` is neither
//! `Send` nor `Sync` and moving one across threads does not compile.

use std::any::Any;

use log::{debug, error, trace};

use super::component::Component;
use super::component_pool::{ComponentPool, ErasedPool};
use super::entity::{Entity, EntityEvent, EntityEventKind, EntityFlags, EntityId};
use super::entity_pool::EntityPool;
use super::entity_ref::{EntityMut, EntityRef};
use super::handle::{ComponentHandle, EntityHandle, SceneId};
use super::registry::{self, ComponentTypeId};
use super::system::SystemEntry;
use crate::error::{Result, SceneError};

#[cfg(feature = "diagnostics")]
use crate::diag::RefreshStats;

/// Construction options for a [`Scene`].
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Entity slots to reserve up front.
    pub entity_capacity: usize,
    /// Emit a `trace!` line for every entity creation, activation and
    /// destruction.
    pub trace_lifecycle: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 64,
            trace_lifecycle: true,
        }
    }
}

impl SceneConfig {
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    pub fn with_lifecycle_trace(mut self, enabled: bool) -> Self {
        self.trace_lifecycle = enabled;
        self
    }
}

pub struct Scene {
    pub(crate) id: SceneId,
    pub(crate) config: SceneConfig,
    pub(crate) entities: EntityPool,
    /// Indexed by [`ComponentTypeId`]; created on first use.
    pub(crate) pools: Vec<Option<Box<dyn ErasedPool>>>,
    pub(crate) systems: Vec<SystemEntry>,
    pub(crate) next_system_order: u64,
    #[cfg(feature = "diagnostics")]
    pub(crate) last_refresh: RefreshStats,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        let id = SceneId::next();
        Self {
            id,
            entities: EntityPool::new(id, config.entity_capacity),
            config,
            pools: Vec::new(),
            systems: Vec::new(),
            next_system_order: 0,
            #[cfg(feature = "diagnostics")]
            last_refresh: RefreshStats::default(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    // ── Entities ────────────────────────────────────────────────────────

    /// Create an inactive entity. An empty name means "unnamed".
    pub fn create_entity(&mut self, name: &str) -> EntityHandle {
        let handle = self.entities.create(name.to_string());
        if self.config.trace_lifecycle {
            trace!("Created entity '{}' (id: {})", name, handle.id);
        }
        handle
    }

    pub fn is_valid(&self, handle: EntityHandle) -> bool {
        self.entities.is_valid(handle)
    }

    /// Resolve a handle. Fails with `InvalidOperation` if it is stale or from
    /// another scene.
    pub fn entity(&self, handle: EntityHandle) -> Result<EntityRef<'_>> {
        let entity = self.entities.get(handle)?;
        Ok(EntityRef {
            scene: self,
            entity,
        })
    }

    pub fn entity_mut(&mut self, handle: EntityHandle) -> Result<EntityMut<'_>> {
        self.entities.get(handle)?;
        Ok(EntityMut {
            scene: self,
            handle,
        })
    }

    /// Handle of the entity currently living under `id`.
    pub fn handle_of(&self, id: EntityId) -> Result<EntityHandle> {
        self.entities.handle_of(id)
    }

    pub fn entity_pool(&self) -> &EntityPool {
        &self.entities
    }

    /// Access for registering entity event listeners.
    pub fn entity_pool_mut(&mut self) -> &mut EntityPool {
        &mut self.entities
    }

    /// Number of activated entities.
    pub fn entity_count(&self) -> usize {
        self.entities.activated_count()
    }

    /// Activated entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.entities
            .iter_activated()
            .map(move |entity| EntityRef {
                scene: self,
                entity,
            })
    }

    /// First activated entity matching `predicate`, in id order.
    pub fn find_first(
        &self,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Option<EntityHandle> {
        self.entities()
            .find(|entity| predicate(*entity))
            .map(|entity| entity.handle())
    }

    /// Every activated entity matching `predicate`, in id order.
    pub fn find(&self, mut predicate: impl FnMut(EntityRef<'_>) -> bool) -> Vec<EntityHandle> {
        self.entities()
            .filter(|entity| predicate(*entity))
            .map(|entity| entity.handle())
            .collect()
    }

    pub fn find_first_by_name(&self, name: &str) -> Option<EntityHandle> {
        self.find_first(|entity| entity.name() == name)
    }

    pub fn set_name(&mut self, handle: EntityHandle, name: &str) -> Result<()> {
        self.entities.get_mut(handle)?.name = name.to_string();
        Ok(())
    }

    /// Transient entities, and everything below them, are left out when the
    /// scene is encoded.
    pub fn set_transient(&mut self, handle: EntityHandle, transient: bool) -> Result<()> {
        self.entities
            .get_mut(handle)?
            .flags
            .set(EntityFlags::TRANSIENT, transient);
        Ok(())
    }

    /// Queue `handle` and every inactive descendant for activation at the next
    /// refresh. Children are queued before their parent.
    ///
    /// Fails if the entity is activated, already queued for activation, or
    /// pending destruction.
    pub fn activate(&mut self, handle: EntityHandle) -> Result<()> {
        let entity = self.entities.get(handle)?;
        if entity.is_activated() {
            return Err(SceneError::invalid("Entity is already activated"));
        }
        if entity.is_pending_activation() {
            return Err(SceneError::invalid("Entity is already pending activation"));
        }
        if entity.is_pending_destruction() {
            return Err(SceneError::invalid("Entity is pending destruction"));
        }
        self.pend_activation(handle.id);
        Ok(())
    }

    fn pend_activation(&mut self, id: EntityId) {
        let Ok(entity) = self.entities.with_id(id) else {
            return;
        };
        for child in entity.children.clone() {
            let eligible = self.entities.with_id(child).is_ok_and(|child| {
                !child.counts_as_active() && !child.is_pending_destruction()
            });
            if eligible {
                self.pend_activation(child);
            }
        }
        self.entities.enqueue_activation(id);
    }

    /// Queue `handle` and all of its descendants for destruction at the next
    /// refresh. Children are queued before their parent.
    ///
    /// Fails if the entity is already pending destruction.
    pub fn destroy(&mut self, handle: EntityHandle) -> Result<()> {
        let entity = self.entities.get(handle)?;
        if entity.is_pending_destruction() {
            return Err(SceneError::invalid("Entity is already pending destruction"));
        }
        self.pend_destruction(handle.id);
        Ok(())
    }

    fn pend_destruction(&mut self, id: EntityId) {
        let Ok(entity) = self.entities.with_id(id) else {
            return;
        };
        for child in entity.children.clone() {
            let eligible = self
                .entities
                .with_id(child)
                .is_ok_and(|child| !child.is_pending_destruction());
            if eligible {
                self.pend_destruction(child);
            }
        }
        self.entities.enqueue_destruction(id);
    }

    /// Attach `child` under `parent`.
    ///
    /// Both must be live entities of this scene, `child` must not have a
    /// parent, `parent` must not be pending destruction, and both must be in
    /// the same activation state (queued for activation counts as active).
    pub fn add_child(&mut self, parent: EntityHandle, child: EntityHandle) -> Result<()> {
        if parent.scene != self.id || child.scene != self.id {
            return Err(SceneError::invalid(
                "Cannot add a child entity from another scene",
            ));
        }
        let parent_entity = self.entities.get(parent)?;
        let child_entity = self.entities.get(child)?;
        if parent == child {
            return Err(SceneError::invalid("Cannot add an entity as its own child"));
        }
        if child_entity.parent.is_some() {
            return Err(SceneError::invalid(
                "Cannot add a child entity which already has a parent",
            ));
        }
        if parent_entity.is_pending_destruction() {
            return Err(SceneError::invalid(
                "Cannot add a child entity to an entity pending destruction",
            ));
        }
        match (parent_entity.counts_as_active(), child_entity.counts_as_active()) {
            (true, false) => {
                return Err(SceneError::invalid(
                    "Cannot add unactivated entity as child of activated entity",
                ));
            }
            (false, true) => {
                return Err(SceneError::invalid(
                    "Cannot add activated entity as child of unactivated entity",
                ));
            }
            _ => {}
        }
        if self.is_ancestor(child.id, parent.id) {
            return Err(SceneError::invalid(
                "Cannot add an ancestor of an entity as its child",
            ));
        }

        if let Some(entity) = self.entities.with_id_mut(parent.id) {
            entity.children.push(child.id);
        }
        if let Some(entity) = self.entities.with_id_mut(child.id) {
            entity.parent = Some(parent.id);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child becomes a root.
    pub fn remove_child(&mut self, parent: EntityHandle, child: EntityHandle) -> Result<()> {
        if parent.scene != self.id || child.scene != self.id {
            return Err(SceneError::invalid(
                "Cannot remove a child entity from another scene",
            ));
        }
        let parent_entity = self.entities.get(parent)?;
        let child_entity = self.entities.get(child)?;
        if child_entity.parent != Some(parent.id) {
            return Err(SceneError::invalid("Entity is not a child of this entity"));
        }
        if parent_entity.is_pending_destruction() {
            return Err(SceneError::invalid(
                "Cannot remove a child entity from an entity pending destruction",
            ));
        }

        if let Some(entity) = self.entities.with_id_mut(parent.id) {
            entity.children.retain(|id| *id != child.id);
        }
        if let Some(entity) = self.entities.with_id_mut(child.id) {
            entity.parent = None;
        }
        Ok(())
    }

    /// Copy `handle`, its components and its whole subtree into new inactive
    /// entities. Children pending destruction are skipped.
    pub fn clone_entity(&mut self, handle: EntityHandle) -> Result<EntityHandle> {
        let source = self.entities.get(handle)?.clone();
        let clone = self.create_entity(&source.name);
        if source.is_transient() {
            self.set_transient(clone, true)?;
        }

        for pool in self.pools.iter_mut().flatten() {
            if pool.contains(source.id) {
                pool.clone_component(source.id, clone.id)?;
            }
        }

        for child in source.children {
            let child = self.entities.handle_of(child)?;
            if self.entities.get(child)?.is_pending_destruction() {
                continue;
            }
            let child_clone = self.clone_entity(child)?;
            self.add_child(clone, child_clone)?;
        }
        Ok(clone)
    }

    // ── Components ──────────────────────────────────────────────────────

    /// Attach `component` to `handle`.
    ///
    /// If the entity is activated, `Add` is dispatched before this returns;
    /// otherwise it is dispatched when the entity activates. Fails if the
    /// entity already has a `T` or `T` is unregistered.
    pub fn add_component<T: Component>(
        &mut self,
        handle: EntityHandle,
        component: T,
    ) -> Result<&mut T> {
        let entity = self.entities.get(handle)?;
        let notify = entity.announced.then(|| entity.name.clone());
        let pool = self.component_pool::<T>()?;
        pool.insert(handle.id, component)?;
        if let Some(name) = notify {
            pool.notify_add(handle, &name);
        }
        pool.get_mut(handle.id)
            .ok_or_else(|| SceneError::invalid("Component vanished during dispatch"))
    }

    /// Attach a default-constructed component by registered name.
    pub fn add_component_by_name(&mut self, handle: EntityHandle, type_name: &str) -> Result<()> {
        let type_id = registry::type_id_of_name(type_name).ok_or_else(|| {
            SceneError::invalid(format!("Unregistered component type '{type_name}'"))
        })?;
        let info = registry::info(type_id).ok_or_else(|| {
            SceneError::invalid(format!("Unregistered component type '{type_name}'"))
        })?;
        self.insert_erased(handle, type_id, info.construct())
    }

    /// Store an already-constructed boxed component of type `type_id`.
    pub(crate) fn insert_erased(
        &mut self,
        handle: EntityHandle,
        type_id: ComponentTypeId,
        value: Box<dyn Any>,
    ) -> Result<()> {
        let entity = self.entities.get(handle)?;
        let notify = entity.announced.then(|| entity.name.clone());
        let pool = self.erased_pool_mut(type_id)?;
        pool.insert_any(handle.id, value)?;
        if let Some(name) = notify {
            pool.notify_add(handle, &name);
        }
        Ok(())
    }

    /// Detach and return the `T` of `handle`. Dispatches `Remove` if the
    /// entity is activated. Fails if the entity has no `T`.
    pub fn remove_component<T: Component>(&mut self, handle: EntityHandle) -> Result<T> {
        let entity = self.entities.get(handle)?;
        let notify = entity.announced.then(|| entity.name.clone());
        let pool = self.component_pool::<T>()?;
        let component = pool.take(handle.id)?;
        Ok(match notify {
            Some(name) => pool.notify_remove(handle, &name, component),
            None => component,
        })
    }

    /// Swap the `T` of `handle` for `component`, returning the old value.
    /// An activated entity sees `Remove` for the old value, then `Add` for the
    /// new one. Fails if the entity has no `T`.
    pub fn replace_component<T: Component>(
        &mut self,
        handle: EntityHandle,
        component: T,
    ) -> Result<T> {
        let previous = self.remove_component::<T>(handle)?;
        self.add_component(handle, component)?;
        Ok(previous)
    }

    pub fn has_component<T: Component>(&self, handle: EntityHandle) -> Result<bool> {
        self.entities.get(handle)?;
        let type_id = registry::type_id_of::<T>()?;
        Ok(self
            .typed_pool::<T>(type_id)
            .is_some_and(|pool| pool.contains(handle.id)))
    }

    pub fn component<T: Component>(&self, handle: EntityHandle) -> Result<&T> {
        self.entities.get(handle)?;
        let type_id = registry::type_id_of::<T>()?;
        self.typed_pool::<T>(type_id)
            .and_then(|pool| pool.get(handle.id))
            .ok_or_else(|| missing_component::<T>())
    }

    pub fn component_mut<T: Component>(&mut self, handle: EntityHandle) -> Result<&mut T> {
        self.entities.get(handle)?;
        self.component_pool::<T>()?
            .get_mut(handle.id)
            .ok_or_else(|| missing_component::<T>())
    }

    /// A handle to the `T` of `handle`. Fails if the entity has no `T`.
    pub fn component_handle<T: Component>(
        &self,
        handle: EntityHandle,
    ) -> Result<ComponentHandle<T>> {
        self.component::<T>(handle)?;
        Ok(ComponentHandle::new(handle))
    }

    /// Resolve a component handle. Fails once the entity is gone or no longer
    /// has a `T`.
    pub fn resolve<T: Component>(&self, handle: ComponentHandle<T>) -> Result<&T> {
        self.component::<T>(handle.entity)
    }

    pub fn resolve_mut<T: Component>(&mut self, handle: ComponentHandle<T>) -> Result<&mut T> {
        self.component_mut::<T>(handle.entity)
    }

    /// The pool for `T`, created if this scene has not stored a `T` yet. Use
    /// it to register listeners or to walk every stored `T`.
    pub fn component_pool<T: Component>(&mut self) -> Result<&mut ComponentPool<T>> {
        let type_id = registry::type_id_of::<T>()?;
        self.erased_pool_mut(type_id)?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .ok_or_else(|| SceneError::invalid("Component pool type mismatch"))
    }

    /// `T` components of activated entities, in pool storage order.
    pub fn iter_components<T: Component>(
        &self,
    ) -> Result<impl Iterator<Item = (EntityHandle, &T)>> {
        let type_id = registry::type_id_of::<T>()?;
        let entities = &self.entities;
        Ok(self
            .typed_pool::<T>(type_id)
            .into_iter()
            .flat_map(|pool| pool.iter())
            .filter_map(move |(id, component)| {
                let entity = entities.with_id(id).ok()?;
                entity
                    .is_activated()
                    .then(|| (entities.handle_unchecked(entity), component))
            }))
    }

    /// Owner of the first activated `T` matching `predicate`.
    pub fn find_first_component<T: Component>(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> Result<Option<EntityHandle>> {
        Ok(self
            .iter_components::<T>()?
            .find(|(_, component)| predicate(component))
            .map(|(entity, _)| entity))
    }

    /// Owners of every activated `T` matching `predicate`.
    pub fn find_components<T: Component>(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> Result<Vec<EntityHandle>> {
        Ok(self
            .iter_components::<T>()?
            .filter(|(_, component)| predicate(component))
            .map(|(entity, _)| entity)
            .collect())
    }

    pub(crate) fn typed_pool<T: Component>(&self, type_id: ComponentTypeId) -> Option<&ComponentPool<T>> {
        self.pools
            .get(type_id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    pub(crate) fn erased_pool(&self, type_id: ComponentTypeId) -> Option<&(dyn ErasedPool + 'static)> {
        self.pools.get(type_id.index())?.as_deref()
    }

    pub(crate) fn erased_pool_mut(
        &mut self,
        type_id: ComponentTypeId,
    ) -> Result<&mut (dyn ErasedPool + 'static)> {
        let index = type_id.index();
        if index >= self.pools.len() {
            self.pools.resize_with(index + 1, || None);
        }
        if self.pools[index].is_none() {
            let info = registry::info(type_id).ok_or_else(|| {
                SceneError::invalid(format!("Unregistered component type {type_id:?}"))
            })?;
            self.pools[index] = Some(info.create_pool());
        }
        self.pools[index]
            .as_deref_mut()
            .ok_or_else(|| SceneError::invalid("Component pool missing"))
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    /// Apply every queued creation, activation and destruction. Never fails.
    pub fn refresh(&mut self) {
        self.initialize_pending_systems();

        let mut created = 0;
        let mut activated = 0;
        let mut destroyed = 0;
        while self.entities.has_pending() {
            for id in self.entities.take_pending_creation() {
                if let Ok(handle) = self.entities.handle_of(id) {
                    self.dispatch_entity_event(EntityEventKind::Create, handle);
                    created += 1;
                }
            }
            for id in self.entities.take_pending_activation() {
                if self.activate_now(id) {
                    activated += 1;
                }
            }
            for id in self.entities.take_pending_destruction() {
                destroyed += self.destroy_now(id);
            }
        }
        self.flush_events();

        if activated + destroyed > 0 {
            debug!(
                "Refreshed scene {:?}: {} created, {} activated, {} destroyed, {} active",
                self.id,
                created,
                activated,
                destroyed,
                self.entities.activated_count()
            );
        }

        #[cfg(feature = "diagnostics")]
        {
            self.last_refresh = RefreshStats {
                created,
                activated,
                destroyed,
                live_entities: self.entities.live_count(),
                active_entities: self.entities.activated_count(),
                free_ids: self.entities.free_count(),
                total_slots: self.entities.total_slots(),
            };
        }
    }

    fn activate_now(&mut self, id: EntityId) -> bool {
        let Some(handle) = self.entities.complete_activation(id) else {
            return false;
        };
        let (name, label) = self
            .entities
            .with_id(id)
            .map(|entity| (entity.name.clone(), entity.label()))
            .unwrap_or_default();

        for pool in self.pools.iter_mut().flatten() {
            if pool.contains(id) {
                pool.notify_add(handle, &name);
            }
        }
        self.dispatch_entity_event(EntityEventKind::Activate, handle);

        if self.config.trace_lifecycle {
            trace!("Activated entity {label}");
        }
        true
    }

    /// Tear down one entity queued for destruction, plus any children still
    /// attached to it. Returns how many entities were reclaimed.
    fn destroy_now(&mut self, id: EntityId) -> usize {
        let Ok(entity) = self.entities.with_id(id) else {
            return 0;
        };
        if !entity.is_pending_destruction() {
            return 0;
        }
        let handle = self.entities.handle_unchecked(entity);
        let name = entity.name.clone();
        let announced = entity.announced;
        let label = entity.label();
        let parent = entity.parent;
        let children = entity.children.clone();

        let mut destroyed = 0;
        for child in children {
            self.entities.mark_pending_destruction(child);
            destroyed += self.destroy_now(child);
        }

        for pool in self.pools.iter_mut().flatten() {
            pool.discard(handle, &name, announced);
        }
        self.dispatch_entity_event(EntityEventKind::Destroy, handle);

        if let Some(parent) = parent.and_then(|parent| self.entities.with_id_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        match self.entities.reclaim(id) {
            Ok(_) => destroyed += 1,
            Err(err) => error!("Failed to reclaim entity {label}: {err}"),
        }

        if self.config.trace_lifecycle {
            trace!("Destroyed entity {label}");
        }
        destroyed
    }

    /// Reclaim an entity nobody has been told about yet: inactive, its
    /// `Create` event still queued. Used to unwind a failed decode.
    pub(crate) fn discard_unannounced(&mut self, handle: EntityHandle) {
        let Ok(entity) = self.entities.get(handle) else {
            return;
        };
        let children = entity.children.clone();
        let parent = entity.parent;
        for child in children {
            if let Ok(child) = self.entities.handle_of(child) {
                self.discard_unannounced(child);
            }
        }
        for pool in self.pools.iter_mut().flatten() {
            pool.discard(handle, "", false);
        }
        if let Some(parent) = parent.and_then(|parent| self.entities.with_id_mut(parent)) {
            parent.children.retain(|child| *child != handle.id);
        }
        self.entities.forget_creation(handle.id);
        if let Err(err) = self.entities.reclaim(handle.id) {
            error!("Failed to discard entity {:?}: {err}", handle);
        }
    }

    fn dispatch_entity_event(&mut self, kind: EntityEventKind, entity: EntityHandle) {
        let name = self
            .entities
            .get(entity)
            .map(|record| record.name.clone())
            .unwrap_or_default();
        let event = EntityEvent { kind, entity, name };
        self.entities.dispatcher_mut().dispatch_event(&event);
    }

    /// Deliver events parked for listeners that were busy.
    pub(crate) fn flush_events(&mut self) {
        self.entities.dispatcher_mut().flush_deferred();
        for pool in self.pools.iter_mut().flatten() {
            pool.flush_deferred();
        }
    }

    /// Statistics of the most recent refresh.
    #[cfg(feature = "diagnostics")]
    pub fn refresh_stats(&self) -> &RefreshStats {
        &self.last_refresh
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    pub(crate) fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(cursor) = current {
            if cursor == ancestor {
                return true;
            }
            current = self.entities.with_id(cursor).ok().and_then(Entity::parent);
        }
        false
    }
}

fn missing_component<T>() -> SceneError {
    SceneError::invalid(format!(
        "Entity does not have component of type '{}'",
        registry::short_type_name(std::any::type_name::<T>())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::ComponentEvent;
    use crate::event::EventListener;
    use serde::{Deserialize, Serialize};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Hull(u32);

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Sail {
        area: f32,
    }

    fn setup() {
        registry::register::<Hull>();
        registry::register::<Sail>();
    }

    /// Writes one line per event, in delivery order.
    #[derive(Default)]
    struct Journal {
        lines: Vec<String>,
    }

    impl EventListener<ComponentEvent<Hull>> for Journal {
        fn receive_event(&mut self, event: &ComponentEvent<Hull>) {
            self.lines.push(format!("{:?} Hull", event.kind));
        }
    }

    impl EventListener<ComponentEvent<Sail>> for Journal {
        fn receive_event(&mut self, event: &ComponentEvent<Sail>) {
            self.lines.push(format!("{:?} Sail", event.kind));
        }
    }

    impl EventListener<EntityEvent> for Journal {
        fn receive_event(&mut self, event: &EntityEvent) {
            self.lines.push(format!("{:?}", event.kind));
        }
    }

    fn journal(scene: &mut Scene) -> Rc<RefCell<Journal>> {
        let journal = Rc::new(RefCell::new(Journal::default()));
        scene.entity_pool_mut().register_listener(&journal);
        scene.component_pool::<Hull>().unwrap().register_listener(&journal);
        scene.component_pool::<Sail>().unwrap().register_listener(&journal);
        journal
    }

    fn active(scene: &mut Scene, name: &str) -> EntityHandle {
        let handle = scene.create_entity(name);
        scene.activate(handle).unwrap();
        scene.refresh();
        handle
    }

    fn message(err: SceneError) -> String {
        err.to_string()
    }

    #[test]
    fn create_is_inactive_until_refresh() {
        let mut scene = Scene::new();
        let ship = scene.create_entity("Ship");
        assert!(scene.is_valid(ship));
        assert!(!scene.entity(ship).unwrap().is_activated());

        scene.activate(ship).unwrap();
        assert!(scene.entity(ship).unwrap().record().is_pending_activation());
        assert_eq!(scene.entity_count(), 0);

        scene.refresh();
        assert!(scene.entity(ship).unwrap().is_activated());
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.find_first_by_name("Ship"), Some(ship));
    }

    #[test]
    fn activate_rejects_repeated_and_doomed_entities() {
        let mut scene = Scene::new();
        let ship = scene.create_entity("Ship");
        scene.activate(ship).unwrap();
        assert_eq!(
            message(scene.activate(ship).unwrap_err()),
            "invalid operation: Entity is already pending activation"
        );

        scene.refresh();
        assert_eq!(
            message(scene.activate(ship).unwrap_err()),
            "invalid operation: Entity is already activated"
        );

        scene.destroy(ship).unwrap();
        assert_eq!(
            message(scene.activate(ship).unwrap_err()),
            "invalid operation: Entity is pending destruction"
        );
    }

    #[test]
    fn destroy_rejects_entity_already_pending_destruction() {
        let mut scene = Scene::new();
        let ship = active(&mut scene, "Ship");
        scene.destroy(ship).unwrap();
        assert_eq!(
            message(scene.destroy(ship).unwrap_err()),
            "invalid operation: Entity is already pending destruction"
        );
        scene.refresh();
        assert!(scene.destroy(ship).unwrap_err().is_invalid_operation());
    }

    #[test]
    fn destroy_request_hides_entity_until_teardown() {
        setup();
        let mut scene = Scene::new();
        let ship = scene.create_entity("Ship");
        scene.add_component(ship, Hull(3)).unwrap();
        scene.activate(ship).unwrap();
        scene.refresh();
        let journal = journal(&mut scene);

        scene.destroy(ship).unwrap();
        let entity = scene.entity(ship).unwrap();
        assert!(entity.record().is_pending_destruction());
        assert!(!entity.is_activated());
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.entities().count(), 0);
        assert_eq!(scene.iter_components::<Hull>().unwrap().count(), 0);
        assert!(scene.component::<Hull>(ship).is_ok());

        scene.refresh();
        assert_eq!(journal.borrow().lines, vec!["Remove Hull", "Destroy"]);
        assert!(!scene.is_valid(ship));
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn components_added_while_pending_destruction_are_paired() {
        setup();
        let mut scene = Scene::new();
        let ship = active(&mut scene, "Ship");
        let journal = journal(&mut scene);

        scene.destroy(ship).unwrap();
        scene.add_component(ship, Sail { area: 12.0 }).unwrap();
        assert_eq!(journal.borrow().lines, vec!["Add Sail"]);

        scene.refresh();
        assert_eq!(journal.borrow().lines, vec!["Add Sail", "Remove Sail", "Destroy"]);
    }

    #[test]
    fn activate_and_destroy_in_one_tick() {
        setup();
        let mut scene = Scene::new();
        let journal = journal(&mut scene);
        let ship = scene.create_entity("Ship");
        scene.add_component(ship, Hull(1)).unwrap();
        scene.add_component(ship, Sail { area: 4.0 }).unwrap();
        scene.activate(ship).unwrap();
        scene.destroy(ship).unwrap();
        assert!(!scene.entity(ship).unwrap().is_activated());

        scene.refresh();
        assert_eq!(
            journal.borrow().lines,
            vec![
                "Create",
                "Add Hull",
                "Add Sail",
                "Activate",
                "Remove Hull",
                "Remove Sail",
                "Destroy"
            ]
        );
        assert!(!scene.is_valid(ship));
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.entity_pool().live_count(), 0);
    }

    #[test]
    fn add_child_rejects_entities_from_another_scene() {
        let mut harbor = Scene::new();
        let mut sea = Scene::new();
        let dock = harbor.create_entity("Dock");
        let boat = sea.create_entity("Boat");
        assert_eq!(
            message(harbor.add_child(dock, boat).unwrap_err()),
            "invalid operation: Cannot add a child entity from another scene"
        );
        assert!(sea.add_child(boat, dock).unwrap_err().is_invalid_operation());
        assert!(harbor.entity(boat).unwrap_err().is_invalid_operation());
    }

    #[test]
    fn add_child_rejects_parent_pending_destruction() {
        let mut scene = Scene::new();
        let fleet = active(&mut scene, "Fleet");
        let ship = scene.create_entity("Ship");
        scene.activate(ship).unwrap();
        scene.destroy(fleet).unwrap();
        assert_eq!(
            message(scene.add_child(fleet, ship).unwrap_err()),
            "invalid operation: Cannot add a child entity to an entity pending destruction"
        );
    }

    #[test]
    fn add_child_rejects_self_and_cycles() {
        let mut scene = Scene::new();
        let a = scene.create_entity("a");
        let b = scene.create_entity("b");
        assert!(scene.add_child(a, a).is_err());
        scene.add_child(a, b).unwrap();
        assert!(scene.add_child(b, a).is_err());
        let c = scene.create_entity("c");
        assert!(scene.add_child(b, c).is_ok());
        assert!(scene.add_child(a, c).is_err());
    }

    #[test]
    fn remove_child_detaches() {
        let mut scene = Scene::new();
        let fleet = scene.create_entity("Fleet");
        let ship = scene.create_entity("Ship");
        scene.add_child(fleet, ship).unwrap();

        scene.remove_child(fleet, ship).unwrap();
        assert_eq!(scene.parent(ship).unwrap(), None);
        assert!(scene.children(fleet).unwrap().is_empty());
        assert_eq!(
            message(scene.remove_child(fleet, ship).unwrap_err()),
            "invalid operation: Entity is not a child of this entity"
        );

        // A detached child survives its old parent.
        scene.activate(fleet).unwrap();
        scene.activate(ship).unwrap();
        scene.refresh();
        scene.destroy(fleet).unwrap();
        scene.refresh();
        assert!(scene.is_valid(ship));
    }

    #[test]
    fn remove_child_rejects_parent_pending_destruction() {
        let mut scene = Scene::new();
        let fleet = scene.create_entity("Fleet");
        let ship = scene.create_entity("Ship");
        scene.add_child(fleet, ship).unwrap();
        scene.activate(fleet).unwrap();
        scene.refresh();

        scene.destroy(fleet).unwrap();
        assert!(scene.remove_child(fleet, ship).unwrap_err().is_invalid_operation());
        scene.refresh();
        assert!(!scene.is_valid(ship));
    }

    #[test]
    fn component_handles_follow_their_entity() {
        setup();
        let mut scene = Scene::new();
        let ship = active(&mut scene, "Ship");
        scene.add_component(ship, Hull(7)).unwrap();
        let hull = scene.component_handle::<Hull>(ship).unwrap();
        assert_eq!(scene.resolve(hull).unwrap(), &Hull(7));
        scene.resolve_mut(hull).unwrap().0 = 8;
        assert_eq!(scene.component::<Hull>(ship).unwrap(), &Hull(8));

        scene.remove_component::<Hull>(ship).unwrap();
        assert!(scene.resolve(hull).is_err());
        assert!(scene.component_handle::<Sail>(ship).is_err());
    }

    #[test]
    fn double_add_and_missing_remove_fail() {
        setup();
        let mut scene = Scene::new();
        let ship = scene.create_entity("Ship");
        scene.add_component(ship, Hull(1)).unwrap();
        assert!(scene.add_component(ship, Hull(2)).unwrap_err().is_invalid_operation());
        assert!(scene.remove_component::<Sail>(ship).unwrap_err().is_invalid_operation());
        assert!(scene.replace_component(ship, Sail::default()).is_err());
        assert_eq!(scene.component::<Hull>(ship).unwrap(), &Hull(1));
    }

    #[test]
    fn add_component_by_name_default_constructs() {
        setup();
        let mut scene = Scene::new();
        let ship = scene.create_entity("Ship");
        scene.add_component_by_name(ship, "Sail").unwrap();
        assert_eq!(scene.component::<Sail>(ship).unwrap(), &Sail::default());
        assert!(scene.add_component_by_name(ship, "Anchor").is_err());
    }

    #[test]
    fn clone_copies_subtree_inactive() {
        setup();
        let mut scene = Scene::new();
        let fleet = scene.create_entity("Fleet");
        let ship = scene.create_entity("Ship");
        scene.add_child(fleet, ship).unwrap();
        scene.add_component(ship, Hull(5)).unwrap();
        scene.activate(fleet).unwrap();
        scene.refresh();

        let copy = scene.clone_entity(fleet).unwrap();
        assert!(!scene.entity(copy).unwrap().is_activated());
        let &[copied_ship] = scene.children(copy).unwrap().as_slice() else {
            panic!("expected one child");
        };
        assert_ne!(copied_ship, ship);
        assert_eq!(scene.component::<Hull>(copied_ship).unwrap(), &Hull(5));
    }
}
