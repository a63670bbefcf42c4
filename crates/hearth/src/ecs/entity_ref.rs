//! Borrowed views of a live entity: [`EntityRef`] for reading, [`EntityMut`]
//! for entity-centric mutation. Both are obtained from a handle through the
//! scene and cannot outlive the borrow.

use std::fmt;

use super::component::Component;
use super::entity::{Entity, EntityId};
use super::handle::EntityHandle;
use super::registry;
use super::scene::Scene;
use crate::error::{Result, SceneError};

/// Read-only view of a live entity and its components.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    pub(crate) scene: &'a Scene,
    pub(crate) entity: &'a Entity,
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("handle", &self.handle())
            .field("name", &self.entity.name)
            .field("flags", &self.entity.flags)
            .finish()
    }
}

impl<'a> EntityRef<'a> {
    pub fn handle(&self) -> EntityHandle {
        self.scene.entities.handle_unchecked(self.entity)
    }

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn name(&self) -> &'a str {
        &self.entity.name
    }

    pub fn record(&self) -> &'a Entity {
        self.entity
    }

    pub fn is_activated(&self) -> bool {
        self.entity.is_activated()
    }

    pub fn is_transient(&self) -> bool {
        self.entity.is_transient()
    }

    pub fn parent(&self) -> Option<EntityRef<'a>> {
        let parent = self.scene.entities.with_id(self.entity.parent?).ok()?;
        Some(EntityRef {
            scene: self.scene,
            entity: parent,
        })
    }

    /// Children in attach order.
    pub fn children(&self) -> impl Iterator<Item = EntityRef<'a>> + use<'a> {
        let scene = self.scene;
        self.entity.children.iter().filter_map(move |&id| {
            scene
                .entities
                .with_id(id)
                .ok()
                .map(|entity| EntityRef { scene, entity })
        })
    }

    pub fn has<T: Component>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// The entity's `T`, if it has one. `None` for unregistered types.
    pub fn get<T: Component>(&self) -> Option<&'a T> {
        let id = registry::type_id_of::<T>().ok()?;
        self.scene.typed_pool::<T>(id)?.get(self.entity.id)
    }
}

/// Mutable, entity-centric access to the scene.
///
/// Every method forwards to the [`Scene`] operation of the same name with
/// this entity's handle.
pub struct EntityMut<'a> {
    pub(crate) scene: &'a mut Scene,
    pub(crate) handle: EntityHandle,
}

impl EntityMut<'_> {
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn name(&self) -> Result<&str> {
        Ok(self.scene.entity(self.handle)?.name())
    }

    pub fn set_name(&mut self, name: &str) -> Result<&mut Self> {
        self.scene.set_name(self.handle, name)?;
        Ok(self)
    }

    pub fn set_transient(&mut self, transient: bool) -> Result<&mut Self> {
        self.scene.set_transient(self.handle, transient)?;
        Ok(self)
    }

    pub fn add<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.scene.add_component(self.handle, component)?;
        Ok(self)
    }

    pub fn remove<T: Component>(&mut self) -> Result<T> {
        self.scene.remove_component::<T>(self.handle)
    }

    pub fn replace<T: Component>(&mut self, component: T) -> Result<T> {
        self.scene.replace_component(self.handle, component)
    }

    pub fn has<T: Component>(&self) -> Result<bool> {
        self.scene.has_component::<T>(self.handle)
    }

    pub fn get<T: Component>(&self) -> Result<&T> {
        self.scene.component::<T>(self.handle)
    }

    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.scene.component_mut::<T>(self.handle)
    }

    pub fn add_child(&mut self, child: EntityHandle) -> Result<&mut Self> {
        self.scene.add_child(self.handle, child)?;
        Ok(self)
    }

    pub fn remove_child(&mut self, child: EntityHandle) -> Result<&mut Self> {
        self.scene.remove_child(self.handle, child)?;
        Ok(self)
    }

    /// Create a new named entity and attach it as a child. The child is
    /// activated along with its parent if the parent is already active.
    pub fn spawn_child(&mut self, name: &str) -> Result<EntityHandle> {
        let parent = self.scene.entity(self.handle)?.record();
        if parent.is_pending_destruction() {
            return Err(SceneError::invalid(
                "Cannot add a child entity to an entity pending destruction",
            ));
        }
        let active = parent.counts_as_active();

        let child = self.scene.create_entity(name);
        if active {
            self.scene.activate(child)?;
        }
        self.scene.add_child(self.handle, child)?;
        Ok(child)
    }

    pub fn activate(&mut self) -> Result<()> {
        self.scene.activate(self.handle)
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.scene.destroy(self.handle)
    }

    pub fn clone_entity(&mut self) -> Result<EntityHandle> {
        self.scene.clone_entity(self.handle)
    }
}
