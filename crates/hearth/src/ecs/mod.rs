//! # Entity-Component Scene Core
//!
//! Entities are generational slots in a per-scene [`EntityPool`]. Components
//! live in one densely packed [`ComponentPool<T>`] per type, keyed by entity
//! id. Component types are registered once per process in the [`registry`],
//! which hands out a [`ComponentTypeId`] token and records how to construct,
//! encode and decode values of the type.
//!
//! ```text
//! Scene
//!  ├─ EntityPool ── slots[id] = { generation, Entity { name, parent, children, flags } }
//!  ├─ pools[token] ── ComponentPool<T> { values, owners, lookup }
//!  └─ systems ── [Rc<RefCell<S>>, ...] in registration order
//! ```
//!
//! Activation and destruction are queued and applied by
//! [`Scene::refresh`]; component additions on activated entities are not.

mod component;
pub(crate) mod component_pool;
mod entity;
mod entity_pool;
mod entity_ref;
mod handle;
mod hierarchy;
mod id_pool;
pub mod registry;
mod scene;
mod system;

pub use component::{Component, ComponentEvent, ComponentEventKind};
pub use component_pool::ComponentPool;
pub use entity::{Entity, EntityEvent, EntityEventKind, EntityFlags, EntityId};
pub use entity_pool::EntityPool;
pub use entity_ref::{EntityMut, EntityRef};
pub use handle::{ComponentHandle, EntityHandle, SceneId};
pub use id_pool::IdPool;
pub use registry::{ComponentInfo, ComponentTypeId};
pub use scene::{Scene, SceneConfig};
pub use system::{Subscriber, System, SystemHandle};
