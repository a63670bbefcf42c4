//! # ComponentPool: Dense Per-Type Storage
//!
//! Every component type used in a scene gets one [`ComponentPool<T>`]. Values
//! are stored contiguously in a `Vec<T>` with a parallel `Vec<EntityId>` of
//! owners, plus an `EntityId → index` map for lookups.
//!
//! ## Iteration order
//!
//! Iteration follows storage order. That is insertion order, except that
//! removal swap-erases: the last element moves into the freed slot.
//!
//! ```text
//! insert a, b, c, d     →  [a, b, c, d]
//! remove b              →  [a, d, c]
//! ```
//!
//! The pool knows nothing about entity lifecycle. The scene decides when an
//! insert or removal is observable and asks the pool to raise the matching
//! [`ComponentEvent`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::component::{Component, ComponentEvent, ComponentEventKind};
use super::entity::EntityId;
use super::handle::EntityHandle;
use super::registry::ComponentTypeId;
use crate::error::{Result, SceneError};
use crate::event::{EventDispatcher, EventListener, ListenerOrder};

pub struct ComponentPool<T: Component> {
    type_id: ComponentTypeId,
    type_name: String,
    values: Vec<T>,
    owners: Vec<EntityId>,
    lookup: HashMap<EntityId, usize>,
    dispatcher: EventDispatcher<ComponentEvent<T>>,
}

impl<T: Component> ComponentPool<T> {
    pub(crate) fn new(type_id: ComponentTypeId, type_name: String) -> Self {
        Self {
            type_id,
            type_name,
            values: Vec::new(),
            owners: Vec::new(),
            lookup: HashMap::new(),
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.lookup.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.lookup.get(&id).map(|&index| &self.values[index])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.lookup.get(&id).map(|&index| &mut self.values[index])
    }

    /// Store `value` for `id`. Fails if `id` already has a `T`.
    pub(crate) fn insert(&mut self, id: EntityId, value: T) -> Result<&mut T> {
        if self.lookup.contains_key(&id) {
            return Err(SceneError::invalid(format!(
                "Entity already has component of type '{}'",
                self.type_name
            )));
        }
        let index = self.values.len();
        self.values.push(value);
        self.owners.push(id);
        self.lookup.insert(id, index);
        Ok(&mut self.values[index])
    }

    /// Remove and return the `T` of `id`. The last stored value takes its slot.
    pub(crate) fn take(&mut self, id: EntityId) -> Result<T> {
        let index = self.lookup.remove(&id).ok_or_else(|| {
            SceneError::invalid(format!(
                "Entity does not have component of type '{}'",
                self.type_name
            ))
        })?;
        let value = self.values.swap_remove(index);
        self.owners.swap_remove(index);
        if let Some(&moved) = self.owners.get(index) {
            self.lookup.insert(moved, index);
        }
        Ok(value)
    }

    /// `(owner, value)` pairs in storage order, regardless of whether the
    /// owner is activated.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.owners.iter().copied().zip(self.values.iter_mut())
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn register_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<ComponentEvent<T>> + 'static,
    {
        self.dispatcher.register_listener(listener)
    }

    pub fn unregister_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<ComponentEvent<T>> + 'static,
    {
        self.dispatcher.unregister_listener(listener)
    }

    pub(crate) fn register_system<L>(&mut self, system: &Rc<RefCell<L>>, order: u64) -> bool
    where
        L: EventListener<ComponentEvent<T>> + 'static,
    {
        let erased: Rc<RefCell<dyn EventListener<ComponentEvent<T>>>> = system.clone();
        self.dispatcher
            .register_ordered(Rc::downgrade(&erased), ListenerOrder::System(order))
    }

    /// Raise `Add` for the value currently stored for `entity`.
    pub(crate) fn notify_add(&mut self, entity: EntityHandle, entity_name: &str) {
        if self.dispatcher.listener_count() == 0 {
            return;
        }
        let Some(component) = self.get(entity.id).cloned() else {
            return;
        };
        let event = ComponentEvent {
            kind: ComponentEventKind::Add,
            entity,
            entity_name: entity_name.to_string(),
            component,
        };
        self.dispatcher.dispatch_event(&event);
    }

    /// Raise `Remove` carrying `component`, then hand the value back.
    pub(crate) fn notify_remove(&mut self, entity: EntityHandle, entity_name: &str, component: T) -> T {
        if self.dispatcher.listener_count() == 0 {
            return component;
        }
        let event = ComponentEvent {
            kind: ComponentEventKind::Remove,
            entity,
            entity_name: entity_name.to_string(),
            component,
        };
        self.dispatcher.dispatch_event(&event);
        event.component
    }
}

/// Object-safe view of a [`ComponentPool<T>`] used where the scene walks every
/// pool without knowing the component types.
pub(crate) trait ErasedPool {
    fn component_type(&self) -> ComponentTypeId;
    fn type_name(&self) -> &str;
    fn len(&self) -> usize;
    fn contains(&self, id: EntityId) -> bool;
    fn get_any(&self, id: EntityId) -> Option<&dyn Any>;
    /// Store a boxed `T`. Fails on a type mismatch or an existing value.
    fn insert_any(&mut self, id: EntityId, value: Box<dyn Any>) -> Result<()>;
    /// Copy the value of `from` onto `to`.
    fn clone_component(&mut self, from: EntityId, to: EntityId) -> Result<()>;
    fn notify_add(&mut self, entity: EntityHandle, entity_name: &str);
    /// Remove the value of `entity` if present, raising `Remove` when `notify`
    /// is set. Returns whether anything was removed.
    fn discard(&mut self, entity: EntityHandle, entity_name: &str, notify: bool) -> bool;
    fn flush_deferred(&mut self);
    fn unregister_ptr(&mut self, ptr: *const ());
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn contains(&self, id: EntityId) -> bool {
        ComponentPool::contains(self, id)
    }

    fn get_any(&self, id: EntityId) -> Option<&dyn Any> {
        self.get(id).map(|value| value as &dyn Any)
    }

    fn insert_any(&mut self, id: EntityId, value: Box<dyn Any>) -> Result<()> {
        let value = value.downcast::<T>().map_err(|_| {
            SceneError::invalid(format!(
                "Value is not a component of type '{}'",
                self.type_name
            ))
        })?;
        self.insert(id, *value)?;
        Ok(())
    }

    fn clone_component(&mut self, from: EntityId, to: EntityId) -> Result<()> {
        let value = self.get(from).cloned().ok_or_else(|| {
            SceneError::invalid(format!(
                "Entity does not have component of type '{}'",
                self.type_name
            ))
        })?;
        self.insert(to, value)?;
        Ok(())
    }

    fn notify_add(&mut self, entity: EntityHandle, entity_name: &str) {
        ComponentPool::notify_add(self, entity, entity_name);
    }

    fn discard(&mut self, entity: EntityHandle, entity_name: &str, notify: bool) -> bool {
        let Ok(value) = self.take(entity.id) else {
            return false;
        };
        if notify {
            self.notify_remove(entity, entity_name, value);
        }
        true
    }

    fn flush_deferred(&mut self) {
        self.dispatcher.flush_deferred();
    }

    fn unregister_ptr(&mut self, ptr: *const ()) {
        self.dispatcher.unregister_ptr(ptr);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
