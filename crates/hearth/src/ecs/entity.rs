//! # Entity: Identity, Hierarchy Links and Lifecycle Flags
//!
//! An [`Entity`] record is small: an id, a name, a parent link, an ordered
//! list of children and a handful of flags. It owns no component data; the
//! scene keeps components in per-type pools keyed by [`EntityId`].
//!
//! ## Lifecycle
//!
//! ```text
//! create ──► (inactive) ──activate()──► PendingActivation ──refresh()──► Activated
//!                                                                          │
//!                          reclaimed ◄──refresh()── PendingDestruction ◄──destroy()
//! ```
//!
//! Only activated entities are visible to systems. Activation and destruction
//! are requests; the state change happens at the next
//! [`Scene::refresh`](super::Scene::refresh).
//!
//! Records are never handed out by value across ticks. Hold an
//! [`EntityHandle`](super::EntityHandle) and resolve it through the scene.

use std::fmt;

use super::handle::EntityHandle;

/// Numeric id of a live entity. Ids are recycled after destruction, so an id
/// on its own says nothing about *which* entity it named in the past.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({:#010x})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Bit set of entity lifecycle flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityFlags(u8);

impl EntityFlags {
    /// Skipped when the scene is encoded.
    pub const TRANSIENT: Self = Self(1 << 0);
    pub const ACTIVATED: Self = Self(1 << 1);
    pub const PENDING_ACTIVATION: Self = Self(1 << 2);
    pub const PENDING_DESTRUCTION: Self = Self(1 << 3);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl std::ops::BitOr for EntityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for EntityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(EntityFlags, &str); 4] = [
            (EntityFlags::TRANSIENT, "TRANSIENT"),
            (EntityFlags::ACTIVATED, "ACTIVATED"),
            (EntityFlags::PENDING_ACTIVATION, "PENDING_ACTIVATION"),
            (EntityFlags::PENDING_DESTRUCTION, "PENDING_DESTRUCTION"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "EntityFlags(empty)")
        } else {
            write!(f, "EntityFlags({})", set.join(" | "))
        }
    }
}

/// A live entity record inside an [`EntityPool`](super::EntityPool).
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) generation: u32,
    pub(crate) name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) flags: EntityFlags,
    /// `Add` events went out for this entity's components, so `Remove` events
    /// are owed when it is torn down. Outlives `ACTIVATED` once the entity is
    /// queued for destruction.
    pub(crate) announced: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, generation: u32, name: String) -> Self {
        Self {
            id,
            generation,
            name,
            parent: None,
            children: Vec::new(),
            flags: EntityFlags::empty(),
            announced: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Child ids in attach order.
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Activated and not queued for destruction. The two states never
    /// overlap: queueing an activated entity for destruction clears this.
    pub fn is_activated(&self) -> bool {
        self.flags.contains(EntityFlags::ACTIVATED)
    }

    pub fn is_pending_activation(&self) -> bool {
        self.flags.contains(EntityFlags::PENDING_ACTIVATION)
    }

    pub fn is_pending_destruction(&self) -> bool {
        self.flags.contains(EntityFlags::PENDING_DESTRUCTION)
    }

    pub fn is_transient(&self) -> bool {
        self.flags.contains(EntityFlags::TRANSIENT)
    }

    /// Activated, about to be, or activated until it was queued for
    /// destruction.
    pub(crate) fn counts_as_active(&self) -> bool {
        self.is_activated() || self.is_pending_activation() || self.announced
    }

    /// Display label used in log lines and error messages.
    pub(crate) fn label(&self) -> String {
        if self.name.is_empty() {
            format!("<unnamed> (id: {})", self.id)
        } else {
            format!("'{}' (id: {})", self.name, self.id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEventKind {
    /// The entity was created. Delivered at the next refresh.
    Create,
    /// The entity became visible to systems.
    Activate,
    /// The entity is about to be reclaimed. Its handle is still valid while
    /// this event is delivered.
    Destroy,
}

/// Lifecycle notification raised by the entity pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEvent {
    pub kind: EntityEventKind,
    pub entity: EntityHandle,
    pub name: String,
}
