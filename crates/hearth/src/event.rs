//! # Events: Synchronous Publish/Subscribe
//!
//! The scene tells interested parties about changes through two event types:
//! [`ComponentEvent<T>`](crate::ecs::ComponentEvent), raised by each component
//! pool, and [`EntityEvent`](crate::ecs::EntityEvent), raised by the entity
//! pool. Both go through the same primitive: an [`EventDispatcher<E>`] holding
//! a list of [`EventListener<E>`]s.
//!
//! ## Ownership
//!
//! Listeners live in `Rc<RefCell<_>>` cells owned by whoever created them. A
//! dispatcher only keeps a `Weak` reference, so dropping the last `Rc` is all
//! it takes to unsubscribe from every dispatcher at once. Dead entries are
//! pruned lazily on the next dispatch.
//!
//! ## Delivery
//!
//! Delivery is synchronous and ordered. Systems come first, in the order they
//! were added to the scene; other listeners follow in the order they
//! registered. A listener receives `&E` and nothing else, so it cannot reach
//! back into the scene while an event is in flight.
//!
//! A listener whose cell is already mutably borrowed when an event arrives
//! (typically a system that adds a component it listens for from inside its
//! own `tick`) cannot be called right away. Its event is parked and handed
//! over by [`EventDispatcher::flush_deferred`], which the scene calls after
//! every system tick and at the end of every refresh. Per-listener order is
//! preserved.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;

/// Receives events of type `E` from an [`EventDispatcher<E>`].
pub trait EventListener<E> {
    fn receive_event(&mut self, event: &E);
}

/// Where a listener sits in the delivery order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ListenerOrder {
    /// A scene system, keyed by its registration index.
    System(u64),
    /// Anything else, keyed by registration sequence.
    External(u64),
}

type ListenerRef<E> = Weak<RefCell<dyn EventListener<E>>>;

struct Registration<E> {
    order: ListenerOrder,
    listener: ListenerRef<E>,
}

/// Fans an event out to every registered [`EventListener<E>`].
pub struct EventDispatcher<E> {
    registrations: Vec<Registration<E>>,
    deferred: Vec<(ListenerRef<E>, E)>,
    next_external: u64,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            deferred: Vec::new(),
            next_external: 0,
        }
    }
}

impl<E: Clone + 'static> EventDispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener`. Returns `false` if it was already subscribed.
    pub fn register_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<E> + 'static,
    {
        let order = ListenerOrder::External(self.next_external);
        self.next_external += 1;
        let erased: Rc<RefCell<dyn EventListener<E>>> = listener.clone();
        self.register_ordered(Rc::downgrade(&erased), order)
    }

    pub(crate) fn register_ordered(&mut self, listener: ListenerRef<E>, order: ListenerOrder) -> bool {
        if self
            .registrations
            .iter()
            .any(|r| Weak::ptr_eq(&r.listener, &listener))
        {
            return false;
        }
        let at = self.registrations.partition_point(|r| r.order <= order);
        self.registrations.insert(at, Registration { order, listener });
        true
    }

    /// Unsubscribe `listener`. Returns `false` if it was not subscribed.
    pub fn unregister_listener<L>(&mut self, listener: &Rc<RefCell<L>>) -> bool
    where
        L: EventListener<E> + 'static,
    {
        self.unregister_ptr(Rc::as_ptr(listener) as *const ())
    }

    /// Unsubscribe whatever listener lives at `ptr`, and drop its parked events.
    pub(crate) fn unregister_ptr(&mut self, ptr: *const ()) -> bool {
        let before = self.registrations.len();
        self.registrations
            .retain(|r| r.listener.as_ptr() as *const () != ptr);
        self.deferred
            .retain(|(listener, _)| listener.as_ptr() as *const () != ptr);
        self.registrations.len() != before
    }

    /// Number of subscribed listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.listener.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every live listener in order. Returns how many
    /// listeners received it right away.
    pub fn dispatch_event(&mut self, event: &E) -> usize {
        self.registrations.retain(|r| r.listener.strong_count() > 0);

        let mut delivered = 0;
        for registration in &self.registrations {
            let Some(listener) = registration.listener.upgrade() else {
                continue;
            };
            let parked = self
                .deferred
                .iter()
                .any(|(waiting, _)| Weak::ptr_eq(waiting, &registration.listener));
            if !parked {
                if let Ok(mut receiver) = listener.try_borrow_mut() {
                    receiver.receive_event(event);
                    delivered += 1;
                    continue;
                }
            }
            debug!("Listener busy, deferring {}", std::any::type_name::<E>());
            self.deferred
                .push((registration.listener.clone(), event.clone()));
        }
        delivered
    }

    /// Retry every parked event. Returns how many were delivered.
    pub fn flush_deferred(&mut self) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut blocked: Vec<ListenerRef<E>> = Vec::new();
        for (waiting, event) in std::mem::take(&mut self.deferred) {
            let Some(listener) = waiting.upgrade() else {
                continue;
            };
            if !blocked.iter().any(|b| Weak::ptr_eq(b, &waiting)) {
                if let Ok(mut receiver) = listener.try_borrow_mut() {
                    receiver.receive_event(&event);
                    delivered += 1;
                    continue;
                }
                blocked.push(waiting.clone());
            }
            self.deferred.push((waiting, event));
        }
        delivered
    }

    /// Whether any event is parked waiting for a busy listener.
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }
}
