//! # Hearth: Scene Core for Entity-Component Games
//!
//! Entities with parent/child hierarchy, typed component pools, systems that
//! subscribe to component and entity lifecycle events, a deferred refresh
//! point for activation and destruction, and serde-based scene persistence.
//!
//! Start with `use hearth::prelude::*`, register component types with
//! [`registry::register`](ecs::registry::register), and build a
//! [`Scene`](ecs::Scene).

pub mod ecs;
pub mod error;
pub mod event;
pub mod prelude;
pub mod serialization;

#[cfg(feature = "diagnostics")]
pub mod diag;
