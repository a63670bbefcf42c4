//! # Component Registry: Runtime Type Tokens and Operation Tables
//!
//! Scenes store component types they were never compiled against by name:
//! loading a saved scene only sees strings like `"Transform"`. The registry
//! bridges the gap. Registering a type once assigns it a
//! [`ComponentTypeId`] and records a table of type-erased operations:
//!
//! | Operation    | Signature                                    |
//! |--------------|----------------------------------------------|
//! | construct    | `fn() -> Box<dyn Any>` (the `Default` value) |
//! | encode       | `&dyn Any → serde_json::Value`               |
//! | decode       | `serde_json::Value → Box<dyn Any>`           |
//! | create pool  | `→ Box<dyn ErasedPool>`                      |
//!
//! Each entry is a plain `fn` pointer produced from a non-capturing generic
//! closure, so an entry is cheap to copy out from under the lock.
//!
//! ## Process-wide
//!
//! The registry is a single `Lazy<RwLock<_>>` shared by every scene in the
//! process. Tokens are assigned in registration order starting at zero and are
//! never reused, so they double as a stable ordering for "every component of
//! an entity" walks.
//!
//! ```ignore
//! let position = registry::register::<Position>();
//! let velocity = registry::register_as::<Velocity>("Velocity")?;
//! assert!(position < velocity);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::component::Component;
use super::component_pool::{ComponentPool, ErasedPool};
use crate::error::{DecodeError, Result, SceneError};

/// Opaque token identifying a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

type ConstructFn = fn() -> Box<dyn Any>;
type EncodeFn = fn(&dyn Any) -> Option<serde_json::Result<serde_json::Value>>;
type DecodeFn = fn(serde_json::Value) -> serde_json::Result<Box<dyn Any>>;
type CreatePoolFn = fn(ComponentTypeId, String) -> Box<dyn ErasedPool>;

/// Registered name and operation table of one component type.
#[derive(Clone)]
pub struct ComponentInfo {
    id: ComponentTypeId,
    name: String,
    construct: ConstructFn,
    encode: EncodeFn,
    decode: DecodeFn,
    create_pool: CreatePoolFn,
}

impl ComponentInfo {
    fn of<T: Component>(id: ComponentTypeId, name: String) -> Self {
        Self {
            id,
            name,
            construct: || Box::new(T::default()) as Box<dyn Any>,
            encode: |any| any.downcast_ref::<T>().map(serde_json::to_value),
            decode: |value| {
                let component: T = serde_json::from_value(value)?;
                Ok(Box::new(component) as Box<dyn Any>)
            },
            create_pool: |id, name| Box::new(ComponentPool::<T>::new(id, name)) as Box<dyn ErasedPool>,
        }
    }

    pub fn id(&self) -> ComponentTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A default-constructed value of the component type.
    pub fn construct(&self) -> Box<dyn Any> {
        (self.construct)()
    }

    /// Encode a value of this type. Fails if `value` is of another type.
    pub fn encode(&self, value: &dyn Any) -> Result<serde_json::Value> {
        match (self.encode)(value) {
            Some(Ok(encoded)) => Ok(encoded),
            Some(Err(source)) => Err(SceneError::Encode {
                component: self.name.clone(),
                source,
            }),
            None => Err(SceneError::invalid(format!(
                "Value is not a component of type '{}'",
                self.name
            ))),
        }
    }

    pub fn decode(&self, value: serde_json::Value) -> std::result::Result<Box<dyn Any>, DecodeError> {
        (self.decode)(value).map_err(|err| DecodeError::Component {
            component: self.name.clone(),
            message: err.to_string(),
        })
    }

    pub(crate) fn create_pool(&self) -> Box<dyn ErasedPool> {
        (self.create_pool)(self.id, self.name.clone())
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ComponentRegistry {
    infos: Vec<ComponentInfo>,
    by_rust_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
}

impl ComponentRegistry {
    fn insert<T: Component>(&mut self, name: String) -> ComponentTypeId {
        let id = ComponentTypeId(self.infos.len() as u32);
        debug!("Registered component type '{name}' as {id:?}");
        self.infos.push(ComponentInfo::of::<T>(id, name.clone()));
        self.by_rust_type.insert(TypeId::of::<T>(), id);
        self.by_name.insert(name, id);
        id
    }
}

static REGISTRY: Lazy<RwLock<ComponentRegistry>> =
    Lazy::new(|| RwLock::new(ComponentRegistry::default()));

/// Register `T` under its short type name. Idempotent: registering the same
/// type again returns the token it already has.
///
/// If another type already owns the short name, `T` is registered under its
/// full path instead.
pub fn register<T: Component>() -> ComponentTypeId {
    let mut registry = REGISTRY.write();
    if let Some(&id) = registry.by_rust_type.get(&TypeId::of::<T>()) {
        return id;
    }
    let full = std::any::type_name::<T>();
    let mut name = short_type_name(full);
    if registry.by_name.contains_key(&name) {
        warn!("Component name '{name}' is taken, registering {full} under its full path");
        name = full.to_string();
    }
    registry.insert::<T>(name)
}

/// Register `T` under an explicit name.
///
/// Fails with `InvalidOperation` if the name belongs to another type, or if
/// `T` is already registered under a different name.
pub fn register_as<T: Component>(name: &str) -> Result<ComponentTypeId> {
    let mut registry = REGISTRY.write();
    let rust_type = TypeId::of::<T>();
    if let Some(&id) = registry.by_rust_type.get(&rust_type) {
        let existing = &registry.infos[id.index()].name;
        if existing == name {
            return Ok(id);
        }
        return Err(SceneError::invalid(format!(
            "Component type is already registered as '{existing}'"
        )));
    }
    if registry.by_name.contains_key(name) {
        warn!("Rejected registration of {}: name '{name}' is taken", std::any::type_name::<T>());
        return Err(SceneError::invalid(format!(
            "Component name '{name}' is already registered"
        )));
    }
    Ok(registry.insert::<T>(name.to_string()))
}

pub fn is_registered<T: 'static>() -> bool {
    REGISTRY.read().by_rust_type.contains_key(&TypeId::of::<T>())
}

/// Token of a registered type. Fails with `InvalidOperation` otherwise.
pub fn type_id_of<T: 'static>() -> Result<ComponentTypeId> {
    REGISTRY
        .read()
        .by_rust_type
        .get(&TypeId::of::<T>())
        .copied()
        .ok_or_else(|| {
            SceneError::invalid(format!(
                "Unregistered component type '{}'",
                short_type_name(std::any::type_name::<T>())
            ))
        })
}

pub fn type_id_of_name(name: &str) -> Option<ComponentTypeId> {
    REGISTRY.read().by_name.get(name).copied()
}

pub fn type_name_of(id: ComponentTypeId) -> Option<String> {
    REGISTRY.read().infos.get(id.index()).map(|info| info.name.clone())
}

pub fn info(id: ComponentTypeId) -> Option<ComponentInfo> {
    REGISTRY.read().infos.get(id.index()).cloned()
}

/// Every registered token, in registration order.
pub fn type_ids() -> Vec<ComponentTypeId> {
    REGISTRY.read().infos.iter().map(|info| info.id).collect()
}

/// Strip module paths from a type name, keeping generic structure:
/// `alloc::vec::Vec<my_game::Item>` becomes `Vec<Item>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut short = String::with_capacity(full.len());
    let mut path = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            path.push(ch);
        } else {
            short.push_str(path.rsplit("::").next().unwrap_or(&path));
            path.clear();
            short.push(ch);
        }
    }
    short.push_str(path.rsplit("::").next().unwrap_or(&path));
    short
}
