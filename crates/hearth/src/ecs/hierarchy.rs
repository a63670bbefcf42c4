//! # Hierarchy Queries
//!
//! Parent/child links are stored on the entity records themselves (see
//! [`Scene::add_child`]). This module adds read-only traversal on top:
//! ancestors walk toward the root, descendants are visited depth-first in
//! pre-order with children in attach order.
//!
//! ```text
//!         root
//!        /    \
//!       a      d          find_descendants(root, _) visits a, b, c, d
//!      / \
//!     b   c
//! ```
//!
//! Every query takes a handle and fails with `InvalidOperation` if it is
//! stale. Predicates receive an [`EntityRef`], so they can look at names,
//! flags and components alike.

use super::entity::EntityId;
use super::entity_ref::EntityRef;
use super::handle::EntityHandle;
use super::scene::Scene;
use crate::error::Result;

impl Scene {
    pub fn parent(&self, handle: EntityHandle) -> Result<Option<EntityHandle>> {
        Ok(self.entity(handle)?.parent().map(|parent| parent.handle()))
    }

    /// The topmost ancestor, or `handle` itself if it has no parent.
    pub fn root(&self, handle: EntityHandle) -> Result<EntityHandle> {
        let mut current = self.entity(handle)?;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        Ok(current.handle())
    }

    /// Children in attach order.
    pub fn children(&self, handle: EntityHandle) -> Result<Vec<EntityHandle>> {
        Ok(self
            .entity(handle)?
            .children()
            .map(|child| child.handle())
            .collect())
    }

    pub fn has_children(&self, handle: EntityHandle) -> Result<bool> {
        Ok(self.entity(handle)?.record().has_children())
    }

    pub fn find_first_child(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Option<EntityHandle>> {
        Ok(self
            .entity(handle)?
            .children()
            .find(|child| predicate(*child))
            .map(|child| child.handle()))
    }

    pub fn find_children(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Vec<EntityHandle>> {
        Ok(self
            .entity(handle)?
            .children()
            .filter(|child| predicate(*child))
            .map(|child| child.handle())
            .collect())
    }

    pub fn find_first_descendant(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Option<EntityHandle>> {
        let mut found = None;
        self.walk_descendants(handle, &mut |entity| {
            if predicate(entity) {
                found = Some(entity.handle());
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }

    pub fn find_descendants(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Vec<EntityHandle>> {
        let mut found = Vec::new();
        self.walk_descendants(handle, &mut |entity| {
            if predicate(entity) {
                found.push(entity.handle());
            }
            true
        })?;
        Ok(found)
    }

    /// Nearest matching ancestor.
    pub fn find_first_ancestor(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Option<EntityHandle>> {
        let mut current = self.entity(handle)?.parent();
        while let Some(ancestor) = current {
            if predicate(ancestor) {
                return Ok(Some(ancestor.handle()));
            }
            current = ancestor.parent();
        }
        Ok(None)
    }

    /// Matching ancestors, nearest first.
    pub fn find_ancestors(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(EntityRef<'_>) -> bool,
    ) -> Result<Vec<EntityHandle>> {
        let mut found = Vec::new();
        self.for_ancestors(handle, |ancestor| {
            if predicate(ancestor) {
                found.push(ancestor.handle());
            }
        })?;
        Ok(found)
    }

    /// Visit every descendant depth-first, pre-order.
    pub fn for_descendants(
        &self,
        handle: EntityHandle,
        mut visit: impl FnMut(EntityRef<'_>),
    ) -> Result<()> {
        self.walk_descendants(handle, &mut |entity| {
            visit(entity);
            true
        })
    }

    /// Visit every ancestor, nearest first.
    pub fn for_ancestors(
        &self,
        handle: EntityHandle,
        mut visit: impl FnMut(EntityRef<'_>),
    ) -> Result<()> {
        let mut current = self.entity(handle)?.parent();
        while let Some(ancestor) = current {
            visit(ancestor);
            current = ancestor.parent();
        }
        Ok(())
    }

    /// Queue every child (and so every descendant) of `handle` for
    /// destruction. Children already pending destruction are left alone.
    pub fn destroy_all_children(&mut self, handle: EntityHandle) -> Result<()> {
        let children: Vec<EntityId> = self.entity(handle)?.record().children().to_vec();
        for child in children {
            let child = self.handle_of(child)?;
            if !self.entity(child)?.record().is_pending_destruction() {
                self.destroy(child)?;
            }
        }
        Ok(())
    }

    /// Pre-order walk below `handle`. `visit` returns `false` to stop.
    fn walk_descendants(
        &self,
        handle: EntityHandle,
        visit: &mut dyn FnMut(EntityRef<'_>) -> bool,
    ) -> Result<()> {
        let mut stack: Vec<EntityRef<'_>> = self.entity(handle)?.children().collect();
        stack.reverse();
        while let Some(entity) = stack.pop() {
            if !visit(entity) {
                break;
            }
            let first = stack.len();
            stack.extend(entity.children());
            stack[first..].reverse();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ecs::registry;
    use crate::ecs::scene::Scene;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Lamp {
        lit: bool,
    }

    /// root ─┬─ a ─┬─ b
    ///       │     └─ c
    ///       └─ d
    fn tree(scene: &mut Scene) -> [crate::ecs::EntityHandle; 5] {
        let root = scene.create_entity("root");
        let a = scene.create_entity("a");
        let b = scene.create_entity("b");
        let c = scene.create_entity("c");
        let d = scene.create_entity("d");
        scene.add_child(root, a).unwrap();
        scene.add_child(a, b).unwrap();
        scene.add_child(a, c).unwrap();
        scene.add_child(root, d).unwrap();
        [root, a, b, c, d]
    }

    fn names(scene: &Scene, handles: &[crate::ecs::EntityHandle]) -> Vec<String> {
        handles
            .iter()
            .map(|h| scene.entity(*h).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn parent_root_and_children() {
        let mut scene = Scene::new();
        let [root, a, b, _c, d] = tree(&mut scene);
        assert_eq!(scene.parent(b).unwrap(), Some(a));
        assert_eq!(scene.parent(root).unwrap(), None);
        assert_eq!(scene.root(b).unwrap(), root);
        assert_eq!(scene.root(root).unwrap(), root);
        assert_eq!(names(&scene, &scene.children(root).unwrap()), vec!["a", "d"]);
        assert!(scene.has_children(a).unwrap());
        assert!(!scene.has_children(d).unwrap());
    }

    #[test]
    fn descendants_are_pre_order() {
        let mut scene = Scene::new();
        let [root, ..] = tree(&mut scene);
        let all = scene.find_descendants(root, |_| true).unwrap();
        assert_eq!(names(&scene, &all), vec!["a", "b", "c", "d"]);

        let mut visited = Vec::new();
        scene
            .for_descendants(root, |e| visited.push(e.name().to_string()))
            .unwrap();
        assert_eq!(visited, vec!["a", "b", "c", "d"]);

        let first = scene
            .find_first_descendant(root, |e| e.name() == "c" || e.name() == "d")
            .unwrap();
        assert_eq!(names(&scene, &[first.unwrap()]), vec!["c"]);
        assert_eq!(scene.find_first_descendant(root, |_| false).unwrap(), None);
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let mut scene = Scene::new();
        let [root, a, b, ..] = tree(&mut scene);
        assert_eq!(scene.find_ancestors(b, |_| true).unwrap(), vec![a, root]);
        assert_eq!(
            scene.find_first_ancestor(b, |e| e.name() == "root").unwrap(),
            Some(root)
        );
        assert_eq!(scene.find_first_ancestor(root, |_| true).unwrap(), None);
    }

    #[test]
    fn child_queries_can_look_at_components() {
        registry::register::<Lamp>();
        let mut scene = Scene::new();
        let [root, a, _b, _c, d] = tree(&mut scene);
        scene.add_component(d, Lamp { lit: true }).unwrap();
        scene.add_component(a, Lamp { lit: false }).unwrap();

        let lit = scene
            .find_first_child(root, |e| e.get::<Lamp>().is_some_and(|lamp| lamp.lit))
            .unwrap();
        assert_eq!(lit, Some(d));
        let with_lamp = scene.find_children(root, |e| e.has::<Lamp>()).unwrap();
        assert_eq!(with_lamp, vec![a, d]);
    }

    #[test]
    fn destroy_all_children_keeps_parent() {
        let mut scene = Scene::new();
        let [root, a, b, c, d] = tree(&mut scene);
        scene.activate(root).unwrap();
        scene.refresh();
        assert_eq!(scene.entity_count(), 5);

        scene.destroy_all_children(root).unwrap();
        scene.refresh();
        assert_eq!(scene.entity_count(), 1);
        assert!(scene.is_valid(root));
        for gone in [a, b, c, d] {
            assert!(!scene.is_valid(gone));
        }
        assert!(!scene.has_children(root).unwrap());
    }

    #[test]
    fn queries_reject_stale_handles() {
        let mut scene = Scene::new();
        let [root, ..] = tree(&mut scene);
        scene.destroy(root).unwrap();
        scene.refresh();
        assert!(scene.children(root).unwrap_err().is_invalid_operation());
        assert!(scene.root(root).is_err());
    }
}
