//! # Components and Component Events
//!
//! Any plain data type can be a component, provided it can be cloned,
//! default-constructed and round-tripped through serde. The bounds are
//! blanket-implemented, so there is nothing to derive beyond the usual
//! `Clone, Default, Serialize, Deserialize`:
//!
//! ```ignore
//! #[derive(Clone, Default, Serialize, Deserialize)]
//! struct Health {
//!     current: f32,
//!     max: f32,
//! }
//!
//! registry::register::<Health>();
//! ```
//!
//! A type must be registered with the
//! [`registry`](super::registry) before a scene will store it.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::handle::EntityHandle;

/// Marker trait for types that can be stored as components.
pub trait Component: Clone + Default + Serialize + DeserializeOwned + 'static {}

impl<T> Component for T where T: Clone + Default + Serialize + DeserializeOwned + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEventKind {
    Add,
    Remove,
}

/// Raised by a [`ComponentPool<T>`](super::ComponentPool) when a `T` is
/// attached to or detached from an activated entity.
///
/// `Add` carries a copy of the stored value. `Remove` carries the value that
/// was taken out of the pool.
#[derive(Debug, Clone)]
pub struct ComponentEvent<T> {
    pub kind: ComponentEventKind,
    pub entity: EntityHandle,
    pub entity_name: String,
    pub component: T,
}
