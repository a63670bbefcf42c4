//! # System: Behavior That Reacts to Scene Changes
//!
//! A system is a value owned by the scene that
//!
//! - subscribes to [`ComponentEvent<T>`]s and/or [`EntityEvent`]s when it is
//!   added, by implementing [`EventListener`] for each event type it wants,
//! - gets [`System::initialize`] once, at the first refresh after it was added,
//! - gets [`System::tick`] every time the scene ticks, in the order systems
//!   were added.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Movement { moving: Vec<EntityHandle> }
//!
//! impl EventListener<ComponentEvent<Velocity>> for Movement {
//!     fn receive_event(&mut self, event: &ComponentEvent<Velocity>) {
//!         match event.kind {
//!             ComponentEventKind::Add => self.moving.push(event.entity),
//!             ComponentEventKind::Remove => self.moving.retain(|e| *e != event.entity),
//!         }
//!     }
//! }
//!
//! impl System for Movement {
//!     fn subscribe(subscriber: &mut Subscriber<'_, Self>) -> Result<()> {
//!         subscriber.component_events::<Velocity>()
//!     }
//!
//!     fn tick(&mut self, scene: &mut Scene, dt: f64) { /* ... */ }
//! }
//! ```
//!
//! Events only carry data. A system cannot touch the scene from inside
//! `receive_event`; it records what it needs and acts on it in `tick`.
//!
//! The scene keeps each system in an `Rc<RefCell<_>>` and hands a clone back
//! as a [`SystemHandle`]. During `tick` the system's cell is borrowed, so any
//! event the system would receive from its own mutations is parked and
//! delivered right after `tick` returns.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use super::component::{Component, ComponentEvent};
use super::entity::EntityEvent;
use super::registry::short_type_name;
use super::scene::Scene;
use crate::error::{Result, SceneError};
use crate::event::{EventListener, ListenerOrder};

pub trait System: Any {
    /// Declare event subscriptions. Called once, when the system is added.
    fn subscribe(subscriber: &mut Subscriber<'_, Self>) -> Result<()>
    where
        Self: Sized,
    {
        let _ = subscriber;
        Ok(())
    }

    fn initialize(&mut self, _scene: &mut Scene) {}

    fn tick(&mut self, _scene: &mut Scene, _dt: f64) {}
}

/// Shared handle to a system owned by a scene.
pub type SystemHandle<S> = Rc<RefCell<S>>;

/// Passed to [`System::subscribe`] to wire a new system into the scene's
/// dispatchers.
pub struct Subscriber<'a, S> {
    scene: &'a mut Scene,
    system: &'a SystemHandle<S>,
    order: u64,
}

impl<S: System> Subscriber<'_, S> {
    /// Receive `Add`/`Remove` events for component type `T`.
    ///
    /// Fails with `InvalidOperation` if `T` is not registered.
    pub fn component_events<T: Component>(&mut self) -> Result<()>
    where
        S: EventListener<ComponentEvent<T>>,
    {
        self.scene
            .component_pool::<T>()?
            .register_system(self.system, self.order);
        Ok(())
    }

    /// Receive entity lifecycle events.
    pub fn entity_events(&mut self)
    where
        S: EventListener<EntityEvent>,
    {
        let erased: Rc<RefCell<dyn EventListener<EntityEvent>>> = self.system.clone();
        self.scene
            .entities
            .dispatcher_mut()
            .register_ordered(Rc::downgrade(&erased), ListenerOrder::System(self.order));
    }

    /// The scene the system is being added to.
    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }
}

pub(crate) struct SystemEntry {
    rust_type: TypeId,
    pub(crate) name: String,
    system: Rc<RefCell<dyn System>>,
    handle: Rc<dyn Any>,
    initialized: bool,
}

impl SystemEntry {
    fn ptr(&self) -> *const () {
        Rc::as_ptr(&self.system) as *const ()
    }
}

impl Scene {
    /// Add a system. It is notified of events from now on, initialized at the
    /// next refresh and ticked after every system added before it.
    ///
    /// Fails with `InvalidOperation` if a system of the same type is already
    /// present, or if one of its subscriptions names an unregistered
    /// component type.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<SystemHandle<S>> {
        let name = short_type_name(std::any::type_name::<S>());
        if self.has_system::<S>() {
            return Err(SceneError::invalid(format!(
                "System '{name}' is already registered"
            )));
        }

        let handle = Rc::new(RefCell::new(system));
        let order = self.next_system_order;
        self.next_system_order += 1;

        let mut subscriber = Subscriber {
            scene: self,
            system: &handle,
            order,
        };
        if let Err(err) = S::subscribe(&mut subscriber) {
            self.unsubscribe_everywhere(Rc::as_ptr(&handle) as *const ());
            return Err(err);
        }

        let erased: Rc<RefCell<dyn System>> = handle.clone();
        let any: Rc<dyn Any> = handle.clone();
        self.systems.push(SystemEntry {
            rust_type: TypeId::of::<S>(),
            name: name.clone(),
            system: erased,
            handle: any,
            initialized: false,
        });
        debug!("Added system '{name}'");
        Ok(handle)
    }

    /// Remove the system of type `S` and unsubscribe it from every event,
    /// even if handles to it are still held elsewhere.
    pub fn remove_system<S: System>(&mut self) -> Result<()> {
        let position = self
            .systems
            .iter()
            .position(|entry| entry.rust_type == TypeId::of::<S>())
            .ok_or_else(|| {
                SceneError::invalid(format!(
                    "System '{}' is not registered",
                    short_type_name(std::any::type_name::<S>())
                ))
            })?;
        let entry = self.systems.remove(position);
        self.unsubscribe_everywhere(entry.ptr());
        debug!("Removed system '{}'", entry.name);
        Ok(())
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.systems
            .iter()
            .any(|entry| entry.rust_type == TypeId::of::<S>())
    }

    /// Handle to the system of type `S`, if present.
    pub fn system<S: System>(&self) -> Option<SystemHandle<S>> {
        let entry = self
            .systems
            .iter()
            .find(|entry| entry.rust_type == TypeId::of::<S>())?;
        entry.handle.clone().downcast::<RefCell<S>>().ok()
    }

    /// Names of the registered systems in tick order.
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|entry| entry.name.as_str())
    }

    /// Tick every system in registration order. Does not refresh.
    pub fn tick(&mut self, dt: f64) {
        let snapshot: Vec<(String, Rc<RefCell<dyn System>>)> = self
            .systems
            .iter()
            .map(|entry| (entry.name.clone(), entry.system.clone()))
            .collect();

        for (name, system) in snapshot {
            let still_registered = self
                .systems
                .iter()
                .any(|entry| Rc::ptr_eq(&entry.system, &system));
            if !still_registered {
                continue;
            }
            match system.try_borrow_mut() {
                Ok(mut system) => system.tick(self, dt),
                Err(_) => warn!("System '{name}' is already running, skipping its tick"),
            }
            self.flush_events();
        }
    }

    /// Run `initialize` on every system added since the last refresh.
    pub(crate) fn initialize_pending_systems(&mut self) {
        let pending: Vec<(String, Rc<RefCell<dyn System>>)> = self
            .systems
            .iter_mut()
            .filter(|entry| !entry.initialized)
            .map(|entry| {
                entry.initialized = true;
                (entry.name.clone(), entry.system.clone())
            })
            .collect();

        for (name, system) in pending {
            match system.try_borrow_mut() {
                Ok(mut system) => system.initialize(self),
                Err(_) => warn!("System '{name}' is busy, skipping initialization"),
            }
            self.flush_events();
        }
    }

    fn unsubscribe_everywhere(&mut self, ptr: *const ()) {
        self.entities.dispatcher_mut().unregister_ptr(ptr);
        for pool in self.pools.iter_mut().flatten() {
            pool.unregister_ptr(ptr);
        }
    }
}
