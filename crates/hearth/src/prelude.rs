//! Convenience re-exports: `use hearth::prelude::*` for the common items.

pub use crate::ecs::registry;
pub use crate::ecs::{
    Component, ComponentEvent, ComponentEventKind, ComponentHandle, ComponentPool, Entity,
    EntityEvent, EntityEventKind, EntityHandle, EntityMut, EntityRef, Scene, SceneConfig,
    Subscriber, System, SystemHandle,
};
pub use crate::error::{DecodeError, Result, SceneError};
pub use crate::event::EventListener;
pub use crate::serialization::{SceneComponent, SceneData, SceneEntity};

#[cfg(feature = "diagnostics")]
pub use crate::diag::{RefreshStats, SceneSnapshot};
