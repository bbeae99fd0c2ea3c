//! Core Identifier Types and Bit-Level Layouts
//!
//! This module defines the **fundamental types, identifiers, and layout
//! constants** shared by every layer of the storage: the sparse index, the
//! sparse set, and the typed pools built on top of them.
//!
//! ## Design Philosophy
//!
//! The storage is designed around:
//!
//! - **Dense, paged value arrays** with stable addresses,
//! - **Compact, copyable numeric identifiers**,
//! - **Sentinel encoding** instead of per-slot option flags.
//!
//! To support these goals efficiently, this module:
//!
//! - Encodes entities into a single 64-bit value,
//! - Reserves sentinel index and version values for *null* and *tombstone*,
//! - Fixes the sparse page granularity as a compile-time constant,
//! - Validates the bit layout with static assertions.
//!
//! ## Entity Representation
//!
//! Entities are encoded as a packed 64-bit integer with the following layout:
//!
//! ```text
//! | version | index |
//! ```
//!
//! - **Index** addresses the entity's slot in the sparse index.
//! - **Version** enables stale-handle detection after an entity dies.
//!
//! The all-ones index is reserved: no live entity ever carries it. Two
//! versions are likewise reserved, one for the *null* sentinel and one for
//! *tombstone* markers left behind by in-place deletion.
//!
//! ## Pages
//!
//! Sparse pages have a fixed, crate-wide slot count ([`SPARSE_PAGE_CAP`]).
//! Dense value pages are sized per component type; [`DEFAULT_PAGE_SIZE`] is
//! the default a type receives unless its traits say otherwise.

/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Entity identifier encoded as a packed 64-bit value.
pub type EntityId = u64;
/// Index part of an entity identifier.
pub type EntityIndex = u32;
/// Generation counter used to detect stale entity handles.
pub type Version = u32;
/// Position inside the packed array, as stored in the sparse index.
pub type DenseIndex = u32;

/// Total number of bits in an [`EntityId`].
pub const ENTITY_BITS: Bits = 64;
/// Number of bits reserved for the entity index.
pub const INDEX_BITS: Bits = 32;
/// Number of bits reserved for entity versioning.
pub const VERSION_BITS: Bits = ENTITY_BITS - INDEX_BITS;

const _: [(); 1] = [(); (INDEX_BITS > 0) as usize];
const _: [(); 1] = [(); (VERSION_BITS > 0) as usize];
const _: [(); 1] = [(); (INDEX_BITS + VERSION_BITS == ENTITY_BITS) as usize];

const fn mask(bits: Bits) -> EntityId {
    if bits == 0 { 0 } else { ((1 as EntityId) << bits) - 1 }
}

/// Mask selecting the index portion of an [`EntityId`].
pub const INDEX_MASK: EntityId = mask(INDEX_BITS);
/// Mask selecting the version portion of an [`EntityId`] after shifting.
pub const VERSION_MASK: EntityId = mask(VERSION_BITS);

/// Reserved index carried by the null sentinel. Never a live index.
pub const RESERVED_INDEX: EntityIndex = INDEX_MASK as EntityIndex;
/// Reserved version carried by the null sentinel.
pub const NULL_VERSION: Version = VERSION_MASK as Version;
/// Reserved version marking tombstoned packed entries.
pub const TOMBSTONE_VERSION: Version = NULL_VERSION - 1;

/// Number of slots in a sparse index page.
pub const SPARSE_PAGE_CAP: usize = 4096;

/// Default number of value slots in a dense page.
///
/// Component types override this through their storage traits; see
/// [`Component::PAGE_SIZE`](crate::engine::component::Component::PAGE_SIZE).
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Sentinel for an absent sparse slot and for the end of the free list.
pub(crate) const ABSENT: DenseIndex = DenseIndex::MAX;
