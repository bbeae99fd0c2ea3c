//! # Entity Handles
//!
//! This module defines the opaque entity identifier consumed by the storage
//! layers, together with its two distinguished values: *null* and *tombstone*.
//!
//! ## Purpose
//! The storage never allocates entities; it treats them as opaque keys handed
//! in by the surrounding runtime. This module is responsible for:
//!
//! - Packing and unpacking the `(index, version)` pair,
//! - Exposing the null sentinel that means "no entity",
//! - Exposing the tombstone marker left in the packed array by in-place
//!   deletion,
//! - Threading the in-place free list through tombstoned entries.
//!
//! ## Entity Model
//! An `Entity` is a compact, versioned handle composed of:
//!
//! - An **index**, identifying the slot in the sparse index,
//! - A **version**, used to detect stale or recycled handles.
//!
//! ## Reserved values
//! - The all-ones index is reserved; no live entity carries it.
//! - [`NULL_VERSION`] and [`TOMBSTONE_VERSION`] are reserved; an entity
//!   allocator layered on top must never hand out either as a live version.
//!
//! The null sentinel and the tombstone marker share the reserved index but
//! differ in version, so the two remain distinguishable as whole values.
//!
//! ## Invariants
//! - Two entities with the same index but different versions are distinct.
//! - A tombstoned packed entry stores the dense position of the next free
//!   slot in its index bits; the reserved index terminates the chain.

use std::fmt;

use crate::engine::types::{
    DenseIndex, EntityId, EntityIndex, Version, INDEX_BITS, INDEX_MASK, NULL_VERSION,
    RESERVED_INDEX, TOMBSTONE_VERSION, ABSENT,
};

/// Opaque, versioned identifier for an entity.
///
/// ## Purpose
/// `Entity` is the key type of the storage: the sparse index maps its index
/// part to a packed position, and the packed array stores the full value so
/// stale handles (same index, older version) are rejected on lookup.
///
/// ## Notes
/// `Entity` values are cheap to copy and compare and are safe to pass across
/// threads.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity(pub EntityId);

#[inline]
const fn make_id(index: EntityIndex, version: Version) -> EntityId {
    ((version as EntityId) << INDEX_BITS) | (index as EntityId)
}

impl Entity {
    /// The absent-entity sentinel. Never stored as a live entry.
    pub const NULL: Entity = Entity(make_id(RESERVED_INDEX, NULL_VERSION));

    /// The canonical tombstone marker.
    ///
    /// Packed entries left behind by in-place deletion compare equal to this
    /// value through [`is_tombstone`](Entity::is_tombstone), even though their
    /// index bits carry free-list state.
    pub const TOMBSTONE: Entity = Entity(make_id(RESERVED_INDEX, TOMBSTONE_VERSION));

    /// Combines an index and a version into an entity handle.
    #[inline]
    pub const fn new(index: EntityIndex, version: Version) -> Self {
        Entity(make_id(index, version))
    }

    /// Returns the index component of this entity.
    #[inline]
    pub const fn index(self) -> EntityIndex {
        (self.0 & INDEX_MASK) as EntityIndex
    }

    /// Returns the version component of this entity.
    #[inline]
    pub const fn version(self) -> Version {
        (self.0 >> INDEX_BITS) as Version
    }

    /// Returns `true` if this is the null sentinel.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    /// Returns `true` if this entry is a tombstone marker.
    #[inline]
    pub const fn is_tombstone(self) -> bool {
        self.version() == TOMBSTONE_VERSION
    }

    /// A packed entry is live when it is neither null nor a tombstone.
    #[inline]
    pub(crate) const fn is_live(self) -> bool {
        !self.is_null() && !self.is_tombstone()
    }

    /// Encodes a free-list link as a tombstoned packed entry.
    #[inline]
    pub(crate) const fn tombstone_link(next: DenseIndex) -> Self {
        Entity(make_id(next as EntityIndex, TOMBSTONE_VERSION))
    }

    /// Dense position of the next free slot, read from a tombstoned entry.
    ///
    /// Returns [`ABSENT`] at the end of the chain.
    #[inline]
    pub(crate) const fn link_next(self) -> DenseIndex {
        debug_assert!(self.is_tombstone());
        self.index() as DenseIndex
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(null)")
        } else if self.is_tombstone() {
            write!(f, "Entity(tombstone @{})", self.index())
        } else {
            write!(f, "Entity({}v{})", self.index(), self.version())
        }
    }
}

const _: () = assert!(Entity::NULL.index() == Entity::TOMBSTONE.index());
const _: () = assert!(Entity::NULL.0 != Entity::TOMBSTONE.0);
const _: () = assert!(ABSENT as EntityIndex == RESERVED_INDEX);
