//! # Sparse Index and Sparse Set
//!
//! This module defines the untyped heart of the storage: a paged mapping from
//! entity index to packed position, and the sparse set that owns it together
//! with the packed array of live entity handles.
//!
//! ## Purpose
//! The sparse set answers membership queries in O(1), keeps live entities
//! densely packed for iteration, and applies one of two deletion policies:
//!
//! - **swap-and-pop** back-fills the vacated slot from the tail, so the
//!   packed array never contains holes,
//! - **in-place** leaves a tombstone behind and threads a free list through
//!   the tombstoned entries, so the positions of other entities never change.
//!
//! ## Design
//! - Sparse pages are allocated lazily and filled with an absent sentinel;
//!   a missing page answers "not present" without allocating.
//! - The free list stores the next free position in the index bits of each
//!   tombstoned packed entry; a side field holds the head.
//! - Mutations that a typed pool must mirror onto its value column are
//!   exposed as crate-private primitives that report the affected positions,
//!   so entity bookkeeping always commits before any value is constructed or
//!   dropped.
//!
//! ## Invariants
//! - For every live entity `e`: `sparse[e.index()] == i` and `packed[i] == e`.
//! - Every packed entry below `len()` is either live or a tombstone.
//! - Under swap-and-pop no tombstones exist and `len() == live_len()`.
//! - Under in-place the tombstoned positions form a chain that visits each
//!   of them exactly once, starting at the free-list head.
//!
//! ## Concurrency
//! This type is **not thread-safe** and must be externally synchronized.
//! Shared reads are safe; any mutation requires exclusive access.

use std::fmt;

use crate::engine::component::DeletionPolicy;
use crate::engine::entity::Entity;
use crate::engine::types::{DenseIndex, EntityIndex, ABSENT, SPARSE_PAGE_CAP};

/// Paged mapping from entity index to packed position.
///
/// Pages are grown monotonically; only [`shrink_to_fit`](SparseIndex::shrink_to_fit)
/// releases them again.
#[derive(Clone, Default)]
pub(crate) struct SparseIndex {
    pages: Vec<Option<Box<[DenseIndex; SPARSE_PAGE_CAP]>>>,
}

impl SparseIndex {
    /// Packed position recorded for `index`, or [`ABSENT`].
    #[inline]
    pub(crate) fn get(&self, index: EntityIndex) -> DenseIndex {
        match self.pages.get(index as usize / SPARSE_PAGE_CAP) {
            Some(Some(page)) => page[index as usize % SPARSE_PAGE_CAP],
            _ => ABSENT,
        }
    }

    /// Records `pos` for `index`, allocating the page on demand.
    pub(crate) fn assign(&mut self, index: EntityIndex, pos: DenseIndex) {
        let page_index = index as usize / SPARSE_PAGE_CAP;
        if page_index >= self.pages.len() {
            self.pages.resize_with(page_index + 1, || None);
        }
        let page = self.pages[page_index]
            .get_or_insert_with(|| Box::new([ABSENT; SPARSE_PAGE_CAP]));
        page[index as usize % SPARSE_PAGE_CAP] = pos;
    }

    /// Resets the slot for `index` to absent.
    pub(crate) fn clear(&mut self, index: EntityIndex) {
        debug_assert!(self.get(index) != ABSENT, "clearing an absent sparse slot");
        if let Some(Some(page)) = self.pages.get_mut(index as usize / SPARSE_PAGE_CAP) {
            page[index as usize % SPARSE_PAGE_CAP] = ABSENT;
        }
    }

    /// Drops trailing pages with no occupied slot; drops the page array
    /// entirely when nothing is occupied.
    pub(crate) fn shrink_to_fit(&mut self) {
        let occupied = |page: &Option<Box<[DenseIndex; SPARSE_PAGE_CAP]>>| {
            page.as_ref()
                .is_some_and(|slots| slots.iter().any(|&slot| slot != ABSENT))
        };
        let keep = self
            .pages
            .iter()
            .rposition(occupied)
            .map_or(0, |last| last + 1);
        self.pages.truncate(keep);
        self.pages.shrink_to_fit();
    }
}

/// Where a staged insertion will land once committed.
#[derive(Clone, Copy, Debug)]
pub(crate) enum StagedPush {
    /// Append at the packed tail.
    Append,
    /// Reuse a tombstoned position popped from the free list.
    Reuse(usize),
}

impl StagedPush {
    /// Packed position the staged insertion resolves to.
    #[inline]
    pub(crate) fn position(self, len: usize) -> usize {
        match self {
            StagedPush::Append => len,
            StagedPush::Reuse(pos) => pos,
        }
    }
}

/// How an erase changed the packed array.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EraseOutcome {
    /// The erased entry was the packed tail; it was popped.
    Popped {
        /// Position the erased entry occupied.
        pos: usize,
    },
    /// The former tail entry was moved into the vacated position.
    Swapped {
        /// Position the erased entry occupied, now holding the moved entry.
        pos: usize,
        /// Former position of the moved entry (the old tail).
        last: usize,
    },
    /// The entry was tombstoned in place.
    Tombstoned {
        /// Position of the new tombstone.
        pos: usize,
    },
}

/// Untyped sparse set over entity handles.
///
/// ## Purpose
/// `SparseSet` is the policy-aware entity bookkeeping layer shared by every
/// typed pool, and a useful container in its own right when no payload is
/// needed (tags, groups, cross-pool ordering donors for
/// [`sort_as`](SparseSet::sort_as)).
///
/// ## Iteration order
/// Entity iteration runs in **reverse insertion order**: the most recently
/// inserted entry is visited first. Tombstoned entries are visible to this
/// untyped view; typed pools skip them when yielding values.
#[derive(Clone)]
pub struct SparseSet {
    index: SparseIndex,
    packed: Vec<Entity>,
    free_head: DenseIndex,
    tombstones: usize,
    policy: DeletionPolicy,
}

impl SparseSet {
    /// Creates an empty set with the given deletion policy. Does not allocate.
    pub fn new(policy: DeletionPolicy) -> Self {
        Self {
            index: SparseIndex::default(),
            packed: Vec::new(),
            free_head: ABSENT,
            tombstones: 0,
            policy,
        }
    }

    /// Creates an empty set with packed capacity for `capacity` entries.
    pub fn with_capacity(policy: DeletionPolicy, capacity: usize) -> Self {
        let mut set = Self::new(policy);
        set.packed = Vec::with_capacity(capacity);
        set
    }

    /// Number of packed entries, tombstones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.packed.len()
    }

    /// Returns `true` if no packed entries exist.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// Number of live entries, tombstones excluded.
    #[inline]
    pub fn live_len(&self) -> usize {
        self.packed.len() - self.tombstones
    }

    /// Packed capacity currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.packed.capacity()
    }

    /// Deletion policy fixed at construction.
    #[inline]
    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    /// Returns `true` if `entity` is stored, with a matching version.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index_of(entity).is_some()
    }

    /// Packed position of `entity`, or `None` when absent or stale.
    #[inline]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        if !entity.is_live() {
            return None;
        }
        match self.index.get(entity.index()) {
            ABSENT => None,
            pos => (self.packed[pos as usize] == entity).then_some(pos as usize),
        }
    }

    /// Packed position of `entity`.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    #[inline]
    pub fn index(&self, entity: Entity) -> usize {
        match self.index_of(entity) {
            Some(pos) => pos,
            None => panic!("entity {entity:?} is not stored in the set"),
        }
    }

    /// Packed entry at position `pos`, tombstones included.
    #[inline]
    pub fn at(&self, pos: usize) -> Option<Entity> {
        self.packed.get(pos).copied()
    }

    /// The packed array, in insertion order. Tombstoned entries are visible.
    #[inline]
    pub fn packed(&self) -> &[Entity] {
        &self.packed
    }

    /// Iterates packed entries in reverse insertion order, tombstones
    /// included.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Entity> + ExactSizeIterator + '_ {
        self.packed.iter().rev().copied()
    }

    /// Appends `entity` and returns the packed position it landed on.
    ///
    /// Returns `None` when the entity is already stored. Under the in-place
    /// policy a tombstoned position is reused before the tail grows.
    pub fn push(&mut self, entity: Entity) -> Option<usize> {
        let staged = self.stage_push(entity)?;
        Some(self.commit_push(entity, staged))
    }

    /// Bulk [`push`](SparseSet::push).
    ///
    /// ## Panics
    /// Panics when any entity is already stored.
    pub fn push_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            assert!(
                self.push(entity).is_some(),
                "entity {entity:?} is already stored in the set"
            );
        }
    }

    /// Erases `entity` under the active deletion policy.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    pub fn erase(&mut self, entity: Entity) {
        let _ = self.erase_entry(entity);
    }

    /// Bulk [`erase`](SparseSet::erase).
    pub fn erase_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.erase(entity);
        }
    }

    /// Erases `entity` if stored; returns whether anything happened.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let present = self.contains(entity);
        if present {
            self.erase(entity);
        }
        present
    }

    /// Bulk [`remove`](SparseSet::remove); returns the number of erased
    /// entries.
    pub fn remove_all(&mut self, entities: impl IntoIterator<Item = Entity>) -> usize {
        entities
            .into_iter()
            .filter(|&entity| self.remove(entity))
            .count()
    }

    /// Removes every entry, keeping allocated capacity.
    pub fn clear(&mut self) {
        while self.pop_entry().is_some() {}
        self.reset_free_list();
    }

    /// Removes all tombstones by back-filling from the tail.
    pub fn compact(&mut self) {
        self.compact_with(|_, _| {});
    }

    /// Ensures packed capacity for at least `capacity` entries in total.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.packed.capacity() {
            self.packed.reserve(capacity - self.packed.len());
        }
    }

    /// Releases unused packed capacity and empty trailing sparse pages.
    ///
    /// On an empty set this drops the whole sparse index.
    pub fn shrink_to_fit(&mut self) {
        self.packed.shrink_to_fit();
        self.index.shrink_to_fit();
    }

    /// Swaps the packed positions of two stored entities.
    ///
    /// ## Panics
    /// Panics when either entity is not stored.
    pub fn swap_elements(&mut self, a: Entity, b: Entity) {
        self.swap_elements_with(a, b, |_, _| {});
    }

    /// Sorts all live entries with an entity comparator returning
    /// "strictly less". After sorting, [`iter`](SparseSet::iter) visits
    /// entries in ascending comparator order.
    ///
    /// ## Panics
    /// Under the in-place policy, panics when tombstones are present;
    /// [`compact`](SparseSet::compact) first.
    pub fn sort(&mut self, cmp: impl FnMut(Entity, Entity) -> bool) {
        let n = self.packed.len();
        self.sort_n(n, cmp);
    }

    /// Sorts the first `n` packed entries; the rest keep their order.
    ///
    /// ## Panics
    /// Panics when `n` exceeds [`len`](SparseSet::len), or when tombstones
    /// are present under the in-place policy.
    pub fn sort_n(&mut self, n: usize, cmp: impl FnMut(Entity, Entity) -> bool) {
        self.sort_n_with(n, cmp, |_, _| {});
    }

    /// Reorders this set so that entities also stored in `other` take the
    /// same relative order as in `other`, packed towards the tail; the
    /// remaining entries keep their relative order.
    ///
    /// Idempotent while `other` is unchanged.
    ///
    /// ## Panics
    /// Panics when tombstones are present under the in-place policy.
    pub fn sort_as(&mut self, other: &SparseSet) {
        self.sort_as_with(other, |_, _| {});
    }

    // ── crate-private primitives shared with the typed pool ────────────────

    /// Resolves where a push of `entity` would land, without committing.
    ///
    /// Returns `None` when the entity is already stored.
    pub(crate) fn stage_push(&self, entity: Entity) -> Option<StagedPush> {
        debug_assert!(entity.is_live(), "cannot store {entity:?}");
        if self.contains(entity) {
            return None;
        }
        match self.free_head {
            ABSENT => Some(StagedPush::Append),
            pos => Some(StagedPush::Reuse(pos as usize)),
        }
    }

    /// Commits a staged push. The staged slot must come from
    /// [`stage_push`](SparseSet::stage_push) with no mutation in between.
    pub(crate) fn commit_push(&mut self, entity: Entity, staged: StagedPush) -> usize {
        match staged {
            StagedPush::Append => {
                let pos = self.packed.len();
                debug_assert!(pos < ABSENT as usize, "packed array is full");
                self.index.assign(entity.index(), pos as DenseIndex);
                self.packed.push(entity);
                pos
            }
            StagedPush::Reuse(pos) => {
                self.free_head = self.packed[pos].link_next();
                self.packed[pos] = entity;
                self.index.assign(entity.index(), pos as DenseIndex);
                self.tombstones -= 1;
                pos
            }
        }
    }

    /// Applies the deletion policy to `entity` and reports how the packed
    /// array changed. All bookkeeping is complete when this returns, so the
    /// typed pool may mirror the change and only then drop the value.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    pub(crate) fn erase_entry(&mut self, entity: Entity) -> EraseOutcome {
        let pos = self.index(entity);
        self.index.clear(entity.index());
        match self.policy {
            DeletionPolicy::SwapAndPop => {
                let last = self.packed.len() - 1;
                if pos != last {
                    let moved = self.packed[last];
                    self.packed[pos] = moved;
                    self.index.assign(moved.index(), pos as DenseIndex);
                    self.packed.pop();
                    EraseOutcome::Swapped { pos, last }
                } else {
                    self.packed.pop();
                    EraseOutcome::Popped { pos }
                }
            }
            DeletionPolicy::InPlace => {
                self.packed[pos] = Entity::tombstone_link(self.free_head);
                self.free_head = pos as DenseIndex;
                self.tombstones += 1;
                EraseOutcome::Tombstoned { pos }
            }
        }
    }

    /// Pops the packed tail entry, clearing its sparse slot when live.
    ///
    /// The free list is left stale; callers drain to empty and then call
    /// [`reset_free_list`](SparseSet::reset_free_list).
    pub(crate) fn pop_entry(&mut self) -> Option<(usize, Entity)> {
        let entity = self.packed.pop()?;
        let pos = self.packed.len();
        if entity.is_tombstone() {
            self.tombstones -= 1;
        } else {
            self.index.clear(entity.index());
        }
        Some((pos, entity))
    }

    /// Resets the in-place free list to empty.
    pub(crate) fn reset_free_list(&mut self) {
        debug_assert!(self.tombstones == 0);
        self.free_head = ABSENT;
    }

    /// [`compact`](SparseSet::compact), reporting each tail-to-hole move to
    /// `relocate` so a typed pool can mirror it on its value column.
    pub(crate) fn compact_with(&mut self, mut relocate: impl FnMut(usize, usize)) {
        if self.tombstones == 0 {
            return;
        }
        let mut len = self.packed.len();
        while len > 0 && self.packed[len - 1].is_tombstone() {
            len -= 1;
        }
        let mut pos = 0;
        while pos < len {
            if self.packed[pos].is_tombstone() {
                let last = len - 1;
                let moved = self.packed[last];
                self.packed[pos] = moved;
                self.index.assign(moved.index(), pos as DenseIndex);
                relocate(last, pos);
                len -= 1;
                while len > 0 && self.packed[len - 1].is_tombstone() {
                    len -= 1;
                }
            }
            pos += 1;
        }
        self.packed.truncate(len);
        self.tombstones = 0;
        self.free_head = ABSENT;
    }

    /// Swaps two packed positions and fixes both sparse slots. Both entries
    /// must be live.
    pub(crate) fn swap_positions(&mut self, a: usize, b: usize, swap: &mut impl FnMut(usize, usize)) {
        if a == b {
            return;
        }
        debug_assert!(self.packed[a].is_live() && self.packed[b].is_live());
        self.packed.swap(a, b);
        self.index.assign(self.packed[a].index(), a as DenseIndex);
        self.index.assign(self.packed[b].index(), b as DenseIndex);
        swap(a, b);
    }

    /// [`swap_elements`](SparseSet::swap_elements) with a value hook.
    pub(crate) fn swap_elements_with(
        &mut self,
        a: Entity,
        b: Entity,
        mut swap: impl FnMut(usize, usize),
    ) {
        let pos_a = self.index(a);
        let pos_b = self.index(b);
        self.swap_positions(pos_a, pos_b, &mut swap);
    }

    /// Validates the preconditions shared by the sorting operations.
    ///
    /// ## Panics
    /// Panics when `n` exceeds the packed length, or when tombstones are
    /// present.
    pub(crate) fn assert_sortable(&self, n: usize) {
        assert!(n <= self.packed.len(), "sort range exceeds the packed array");
        assert!(
            self.tombstones == 0,
            "cannot sort a set with tombstones; compact first"
        );
    }

    /// [`sort_n`](SparseSet::sort_n) with a value hook: insertion sort over
    /// the leading `n` entries, swapping values through `swap` so a typed
    /// pool stays in lock-step.
    pub(crate) fn sort_n_with(
        &mut self,
        n: usize,
        mut cmp: impl FnMut(Entity, Entity) -> bool,
        mut swap: impl FnMut(usize, usize),
    ) {
        self.assert_sortable(n);
        // Ordered so that iteration (tail to head) visits entries in
        // ascending comparator order.
        for i in 1..n {
            let mut j = i;
            while j > 0 && cmp(self.packed[j - 1], self.packed[j]) {
                self.swap_positions(j, j - 1, &mut swap);
                j -= 1;
            }
        }
    }

    /// [`sort_as`](SparseSet::sort_as) with a value hook.
    pub(crate) fn sort_as_with(&mut self, other: &SparseSet, mut swap: impl FnMut(usize, usize)) {
        assert!(
            self.tombstones == 0,
            "cannot reorder a set with tombstones; compact first"
        );
        let mut pos = match self.packed.len() {
            0 => return,
            n => n - 1,
        };
        for entity in other.iter() {
            if pos == 0 {
                break;
            }
            if !entity.is_live() {
                continue;
            }
            if let Some(cur) = self.index_of(entity) {
                if entity != self.packed[pos] {
                    self.swap_positions(cur, pos, &mut swap);
                }
                pos -= 1;
            }
        }
    }
}

impl Default for SparseSet {
    /// An empty swap-and-pop set.
    fn default() -> Self {
        Self::new(DeletionPolicy::SwapAndPop)
    }
}

impl fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseSet")
            .field("policy", &self.policy)
            .field("len", &self.packed.len())
            .field("tombstones", &self.tombstones)
            .finish()
    }
}
