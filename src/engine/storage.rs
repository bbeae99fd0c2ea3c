//! # Typed Component Pools
//!
//! This module defines [`Storage<T>`], the typed pool that keeps a paged
//! dense column of `T` in lock-step with an untyped [`SparseSet`], and the
//! type-erased [`ErasedStorage`] trait a registry uses to drive pools of
//! unknown component type.
//!
//! ## Purpose
//! `Storage<T>` is the container the surrounding runtime instantiates once
//! per component kind. It provides:
//!
//! - O(1) membership tests and lookups keyed by entity handle,
//! - densely packed values for cache-friendly traversal,
//! - stable value addresses across growth (paged layout),
//! - the deletion policy selected by the component's storage traits.
//!
//! ## Commit ordering
//! Mutations are ordered so the pool is never observable in a broken state:
//!
//! - insertion constructs the value in its slot *before* the sparse and
//!   packed bookkeeping commits, so a panicking producer leaves the pool
//!   untouched,
//! - erasure completes all bookkeeping and detaches the value *before* the
//!   value is dropped, so drop logic observes a consistent pool.
//!
//! ## Invalidation
//! `emplace`, `insert`, `push`, `reserve`, and `erase` never move a value
//! across memory addresses. `sort`, `sort_as`, `swap_elements`, and
//! `compact` move values between slots and invalidate references into the
//! pool.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::iter::Rev;
use std::ptr::NonNull;

use rayon::prelude::*;

use crate::engine::component::{Component, DeletionPolicy};
use crate::engine::dense::PagedColumn;
use crate::engine::entity::Entity;
use crate::engine::error::AlreadyPresentError;
use crate::engine::iter::{Each, EachMut, Pages, Values, ValuesMut};
use crate::engine::sparse::{EraseOutcome, SparseSet};

/// Typed pool mapping entities to densely packed values of `T`.
///
/// ## Deletion policy
/// Fixed at construction from `T`'s storage traits. Under swap-and-pop the
/// packed array never contains holes; under in-place deletion erased
/// positions hold tombstones until [`compact`](Storage::compact) runs, and
/// the positions of other values never change.
///
/// ## Iteration order
/// Reverse insertion order, shared with the untyped entity view. Value
/// iterators skip tombstones; [`entities`](Storage::entities) does not.
pub struct Storage<T: Component> {
    base: SparseSet,
    values: PagedColumn<T>,
}

impl<T: Component> Storage<T> {
    /// Creates an empty pool. Does not allocate.
    pub fn new() -> Self {
        Self {
            base: SparseSet::new(DeletionPolicy::of::<T>()),
            values: PagedColumn::new(),
        }
    }

    /// Creates an empty pool with capacity for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::new();
        pool.reserve(capacity);
        pool
    }

    // ── queries ────────────────────────────────────────────────────────────

    /// Number of packed entries, tombstones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Returns `true` if no packed entries exist.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Number of live values, tombstones excluded.
    #[inline]
    pub fn live_len(&self) -> usize {
        self.base.live_len()
    }

    /// Number of allocated value slots. Always a multiple of the page size,
    /// or zero.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Deletion policy fixed at construction.
    #[inline]
    pub fn policy(&self) -> DeletionPolicy {
        self.base.policy()
    }

    /// Returns `true` if `entity` is stored, with a matching version.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.base.contains(entity)
    }

    /// Packed position of `entity`, or `None` when absent or stale.
    #[inline]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.base.index_of(entity)
    }

    /// Packed position of `entity`.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    #[inline]
    pub fn index(&self, entity: Entity) -> usize {
        self.base.index(entity)
    }

    /// Packed entry at position `pos`, tombstones included.
    #[inline]
    pub fn at(&self, pos: usize) -> Option<Entity> {
        self.base.at(pos)
    }

    /// The underlying entity set.
    ///
    /// Useful as the ordering donor for [`sort_as`](Storage::sort_as) on
    /// another pool.
    #[inline]
    pub fn set(&self) -> &SparseSet {
        &self.base
    }

    /// Shared reference to the value stored for `entity`.
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let pos = self.base.index_of(entity)?;
        Some(unsafe { self.values.get_ref(pos) })
    }

    /// Exclusive reference to the value stored for `entity`.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let pos = self.base.index_of(entity)?;
        Some(unsafe { self.values.get_mut(pos) })
    }

    /// [`get`](Storage::get) wrapped in a one-element tuple, for zipping
    /// with the accessors of other pools.
    #[inline]
    pub fn get_as_tuple(&self, entity: Entity) -> Option<(&T,)> {
        self.get(entity).map(|value| (value,))
    }

    // ── insertion ──────────────────────────────────────────────────────────

    /// Stores `value` for `entity` and returns a reference with a stable
    /// address.
    ///
    /// Under the in-place policy a tombstoned position is reused before the
    /// tail grows.
    ///
    /// ## Panics
    /// Panics when `entity` is already stored.
    pub fn emplace(&mut self, entity: Entity, value: T) -> &mut T {
        match self.try_emplace(entity, value) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    /// Fallible [`emplace`](Storage::emplace).
    pub fn try_emplace(&mut self, entity: Entity, value: T) -> Result<&mut T, AlreadyPresentError> {
        let staged = self
            .base
            .stage_push(entity)
            .ok_or(AlreadyPresentError { entity })?;
        let pos = staged.position(self.base.len());
        self.values.assure(pos);
        unsafe { self.values.write(pos, value) };
        self.base.commit_push(entity, staged);
        Ok(unsafe { self.values.get_mut(pos) })
    }

    /// Stores the value built by `producer` for `entity`.
    ///
    /// The producer runs before any bookkeeping commits: if it panics, the
    /// pool is left exactly as it was.
    ///
    /// ## Panics
    /// Panics when `entity` is already stored.
    pub fn emplace_with(&mut self, entity: Entity, producer: impl FnOnce() -> T) -> &mut T {
        assert!(
            !self.base.contains(entity),
            "entity {entity:?} is already stored in the pool"
        );
        let value = producer();
        self.emplace(entity, value)
    }

    /// Stores a default-constructed value for `entity`; returns the packed
    /// position used, or `None` when the entity is already stored.
    pub fn push(&mut self, entity: Entity) -> Option<usize>
    where
        T: Default,
    {
        let staged = self.base.stage_push(entity)?;
        let pos = staged.position(self.base.len());
        self.values.assure(pos);
        unsafe { self.values.write(pos, T::default()) };
        Some(self.base.commit_push(entity, staged))
    }

    /// Bulk [`push`](Storage::push).
    ///
    /// ## Panics
    /// Panics when any entity is already stored.
    pub fn push_all(&mut self, entities: impl IntoIterator<Item = Entity>)
    where
        T: Default,
    {
        for entity in entities {
            assert!(
                self.push(entity).is_some(),
                "entity {entity:?} is already stored in the pool"
            );
        }
    }

    /// Stores a clone of `value` for every entity, in the given order.
    ///
    /// On a panicking clone, entities already processed stay stored and the
    /// pool remains consistent.
    ///
    /// ## Panics
    /// Panics when any entity is already stored.
    pub fn insert(&mut self, entities: &[Entity], value: &T)
    where
        T: Clone,
    {
        for &entity in entities {
            self.emplace(entity, value.clone());
        }
    }

    /// Fallible [`insert`](Storage::insert): stores a clone of `value` for
    /// every entity, stopping at the first entity that is already stored.
    ///
    /// Returns the number of values stored. Like the panicking bulk insert
    /// this gives the basic guarantee: entities processed before the
    /// offending one stay stored and the pool remains consistent.
    pub fn try_insert(&mut self, entities: &[Entity], value: &T) -> Result<usize, AlreadyPresentError>
    where
        T: Clone,
    {
        for &entity in entities {
            self.try_emplace(entity, value.clone())?;
        }
        Ok(entities.len())
    }

    /// Stores one value per entity, consumed from `values` in lock-step.
    ///
    /// ## Panics
    /// Panics when `values` yields fewer items than `entities`, or when any
    /// entity is already stored.
    pub fn insert_from(&mut self, entities: &[Entity], values: impl IntoIterator<Item = T>) {
        let mut values = values.into_iter();
        for &entity in entities {
            let value = values
                .next()
                .unwrap_or_else(|| panic!("no value supplied for entity {entity:?}"));
            self.emplace(entity, value);
        }
    }

    /// Applies `f` to the value stored for `entity` and returns the value.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    pub fn patch(&mut self, entity: Entity, f: impl FnOnce(&mut T)) -> &mut T {
        let pos = self.base.index(entity);
        f(unsafe { self.values.get_mut(pos) });
        unsafe { self.values.get_mut(pos) }
    }

    // ── removal ────────────────────────────────────────────────────────────

    /// Detaches the value for `entity` after all entity bookkeeping has
    /// committed, so dropping it happens on a consistent pool.
    fn detach(&mut self, entity: Entity) -> T {
        let Self { base, values } = self;
        match base.erase_entry(entity) {
            EraseOutcome::Popped { pos } => unsafe { values.read(pos) },
            EraseOutcome::Swapped { pos, last } => unsafe {
                let value = values.read(pos);
                values.relocate(last, pos);
                value
            },
            EraseOutcome::Tombstoned { pos } => unsafe { values.read(pos) },
        }
    }

    /// Erases `entity` under the active deletion policy and drops its value.
    ///
    /// ## Panics
    /// Panics when `entity` is not stored.
    pub fn erase(&mut self, entity: Entity) {
        drop(self.detach(entity));
    }

    /// Bulk [`erase`](Storage::erase).
    pub fn erase_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.erase(entity);
        }
    }

    /// Erases `entity` if stored; returns whether anything happened.
    pub fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    /// Bulk [`remove`](Storage::remove); returns the number of erased
    /// values.
    pub fn remove_all(&mut self, entities: impl IntoIterator<Item = Entity>) -> usize {
        entities
            .into_iter()
            .filter(|&entity| self.remove(entity))
            .count()
    }

    /// Erases `entity` and hands its value back instead of dropping it.
    ///
    /// The pool is fully consistent by the time the caller receives the
    /// value, so its drop logic may freely mutate this pool again.
    pub fn take(&mut self, entity: Entity) -> Option<T> {
        self.base
            .contains(entity)
            .then(|| self.detach(entity))
    }

    /// Removes every value, keeping allocated capacity.
    pub fn clear(&mut self) {
        let Self { base, values } = self;
        while let Some((pos, entity)) = base.pop_entry() {
            if !entity.is_tombstone() {
                drop(unsafe { values.read(pos) });
            }
        }
        base.reset_free_list();
    }

    /// Removes all tombstones by back-filling values from the tail.
    pub fn compact(&mut self) {
        let Self { base, values } = self;
        base.compact_with(|from, to| unsafe { values.relocate(from, to) });
    }

    // ── capacity ───────────────────────────────────────────────────────────

    /// Ensures capacity for at least `capacity` values in total. Grows page
    /// by page; existing values never move.
    pub fn reserve(&mut self, capacity: usize) {
        self.base.reserve(capacity);
        self.values.reserve(capacity);
    }

    /// Releases unused capacity. On an empty pool this drops every page and
    /// the whole sparse index, leaving [`capacity`](Storage::capacity) at
    /// zero.
    pub fn shrink_to_fit(&mut self) {
        self.base.shrink_to_fit();
        self.values.shrink_to(self.base.len());
    }

    // ── reordering ─────────────────────────────────────────────────────────

    /// Swaps the packed positions and values of two stored entities.
    ///
    /// ## Panics
    /// Panics when either entity is not stored.
    pub fn swap_elements(&mut self, a: Entity, b: Entity) {
        let Self { base, values } = self;
        base.swap_elements_with(a, b, |x, y| unsafe { values.swap(x, y) });
    }

    /// Sorts all entries with an entity comparator returning "strictly
    /// less"; values follow their entities. After sorting,
    /// [`iter`](Storage::iter) visits values in ascending comparator order.
    ///
    /// ## Panics
    /// Under the in-place policy, panics when tombstones are present;
    /// [`compact`](Storage::compact) first.
    pub fn sort(&mut self, cmp: impl FnMut(Entity, Entity) -> bool) {
        let n = self.base.len();
        self.sort_n(n, cmp);
    }

    /// Sorts the first `n` packed entries with an entity comparator.
    ///
    /// ## Panics
    /// As [`sort`](Storage::sort), and when `n` exceeds [`len`](Storage::len).
    pub fn sort_n(&mut self, n: usize, cmp: impl FnMut(Entity, Entity) -> bool) {
        let Self { base, values } = self;
        base.sort_n_with(n, cmp, |x, y| unsafe { values.swap(x, y) });
    }

    /// Sorts all entries with a value comparator returning "strictly less".
    ///
    /// ## Panics
    /// As [`sort`](Storage::sort).
    pub fn sort_by(&mut self, cmp: impl FnMut(&T, &T) -> bool) {
        let n = self.base.len();
        self.sort_n_by(n, cmp);
    }

    /// Sorts the first `n` packed entries with a value comparator.
    ///
    /// Insertion sort, like the entity-keyed overloads; the comparator runs
    /// between swaps, so a panic mid-sort leaves a consistent (partially
    /// ordered) pool.
    ///
    /// ## Panics
    /// As [`sort_n`](Storage::sort_n).
    pub fn sort_n_by(&mut self, n: usize, mut cmp: impl FnMut(&T, &T) -> bool) {
        let Self { base, values } = self;
        base.assert_sortable(n);
        // Same ordering convention as the entity-keyed overloads: iteration
        // visits values in ascending comparator order.
        for i in 1..n {
            let mut j = i;
            while j > 0 && cmp(unsafe { values.get_ref(j - 1) }, unsafe { values.get_ref(j) }) {
                base.swap_positions(j, j - 1, &mut |x, y| unsafe { values.swap(x, y) });
                j -= 1;
            }
        }
    }

    /// Reorders this pool so that entities also stored in `other` take the
    /// same relative order as in `other`, packed towards the tail; the
    /// remaining entries keep their relative order. Values follow their
    /// entities.
    ///
    /// Idempotent while `other` is unchanged.
    ///
    /// ## Panics
    /// Panics when tombstones are present under the in-place policy.
    pub fn sort_as(&mut self, other: &SparseSet) {
        let Self { base, values } = self;
        base.sort_as_with(other, |x, y| unsafe { values.swap(x, y) });
    }

    // ── traversal ──────────────────────────────────────────────────────────

    /// Iterates live values in reverse insertion order.
    pub fn iter(&self) -> Values<'_, T> {
        Values::new(self.base.packed(), self.base.live_len(), &self.values)
    }

    /// Iterates live values mutably in reverse insertion order.
    pub fn iter_mut(&mut self) -> ValuesMut<'_, T> {
        let Self { base, values } = self;
        ValuesMut::new(base.packed(), base.live_len(), values)
    }

    /// Iterates `(entity, value)` pairs in reverse insertion order.
    pub fn each(&self) -> Each<'_, T> {
        Each::new(self.base.packed(), self.base.live_len(), &self.values)
    }

    /// Iterates `(entity, value)` pairs mutably in reverse insertion order.
    pub fn each_mut(&mut self) -> EachMut<'_, T> {
        let Self { base, values } = self;
        EachMut::new(base.packed(), base.live_len(), values)
    }

    /// [`each`](Storage::each) in reverse: oldest live element first.
    pub fn reach(&self) -> Rev<Each<'_, T>> {
        self.each().rev()
    }

    /// [`each_mut`](Storage::each_mut) in reverse.
    pub fn reach_mut(&mut self) -> Rev<EachMut<'_, T>> {
        self.each_mut().rev()
    }

    /// Iterates packed entity entries in reverse insertion order, tombstones
    /// included.
    pub fn entities(&self) -> impl DoubleEndedIterator<Item = Entity> + ExactSizeIterator + '_ {
        self.base.iter()
    }

    /// The packed entity array, in insertion order.
    #[inline]
    pub fn packed(&self) -> &[Entity] {
        self.base.packed()
    }

    /// Page-by-page view of the dense values, in insertion order.
    ///
    /// ## Panics
    /// Panics when tombstones are present; [`compact`](Storage::compact)
    /// first.
    pub fn raw(&self) -> Pages<'_, T> {
        assert!(
            self.base.live_len() == self.base.len(),
            "raw view requires a fully packed pool; compact first"
        );
        Pages::new(&self.values, self.base.len())
    }

    // ── parallel sweeps ────────────────────────────────────────────────────

    /// Runs `f` over every live `(entity, value)` pair in parallel.
    ///
    /// Visit order is unspecified.
    pub fn par_for_each<F>(&self, f: F)
    where
        T: Sync,
        F: Fn(Entity, &T) + Sync + Send,
    {
        let packed = self.base.packed();
        (0..packed.len()).into_par_iter().for_each(|pos| {
            let entity = packed[pos];
            if !entity.is_tombstone() {
                f(entity, unsafe { self.values.get_ref(pos) });
            }
        });
    }

    /// Runs `f` over every live `(entity, value)` pair in parallel, with
    /// exclusive value access. Work splits along page boundaries.
    ///
    /// Visit order is unspecified.
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        T: Send,
        F: Fn(Entity, &mut T) + Sync + Send,
    {
        let Self { base, values } = self;
        let packed = base.packed();
        let len = packed.len();
        values
            .pages_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(page, slots)| {
                let first = page * T::PAGE_SIZE;
                for (offset, slot) in slots.iter_mut().enumerate() {
                    let pos = first + offset;
                    if pos >= len {
                        break;
                    }
                    let entity = packed[pos];
                    if !entity.is_tombstone() {
                        f(entity, unsafe { slot.assume_init_mut() });
                    }
                }
            });
    }
}

impl<T: Component> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Drop for Storage<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Component + Clone> Clone for Storage<T> {
    /// Clones live values slot for slot; the tombstone layout and free list
    /// are preserved exactly.
    fn clone(&self) -> Self {
        let mut values = PagedColumn::new();
        values.reserve(self.base.len());
        for (pos, &entity) in self.base.packed().iter().enumerate() {
            if !entity.is_tombstone() {
                let value = unsafe { self.values.get_ref(pos) }.clone();
                unsafe { values.write(pos, value) };
            }
        }
        Self {
            base: self.base.clone(),
            values,
        }
    }
}

impl<T: Component> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("type", &type_name::<T>())
            .field("set", &self.base)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<'a, T: Component> IntoIterator for &'a Storage<T> {
    type Item = &'a T;
    type IntoIter = Values<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Component> IntoIterator for &'a mut Storage<T> {
    type Item = &'a mut T;
    type IntoIter = ValuesMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Type-erased pool interface.
///
/// ## Purpose
/// A registry stores one pool per component kind behind
/// `Box<dyn ErasedStorage>` and drives entity-level operations without
/// knowing `T`. Typed access goes through
/// [`as_any`](ErasedStorage::as_any) and downcasting.
pub trait ErasedStorage: Any {
    /// Number of packed entries, tombstones included.
    fn len(&self) -> usize;
    /// Returns `true` if no packed entries exist.
    fn is_empty(&self) -> bool;
    /// Number of live values, tombstones excluded.
    fn live_len(&self) -> usize;
    /// Number of allocated value slots.
    fn capacity(&self) -> usize;
    /// Deletion policy fixed at construction.
    fn policy(&self) -> DeletionPolicy;
    /// Returns `true` if `entity` is stored, with a matching version.
    fn contains(&self, entity: Entity) -> bool;
    /// Packed position of `entity`, or `None` when absent or stale.
    fn index_of(&self, entity: Entity) -> Option<usize>;
    /// Packed entry at position `pos`, tombstones included.
    fn at(&self, pos: usize) -> Option<Entity>;
    /// Erases `entity`; panics when not stored.
    fn erase(&mut self, entity: Entity);
    /// Erases `entity` if stored; returns whether anything happened.
    fn remove(&mut self, entity: Entity) -> bool;
    /// Removes every value, keeping allocated capacity.
    fn clear(&mut self);
    /// Removes all tombstones.
    fn compact(&mut self);
    /// Ensures capacity for at least `capacity` values in total.
    fn reserve(&mut self, capacity: usize);
    /// Releases unused capacity.
    fn shrink_to_fit(&mut self);
    /// Swaps the packed positions and values of two stored entities.
    fn swap_elements(&mut self, a: Entity, b: Entity);
    /// `TypeId` of the stored component type.
    fn element_type_id(&self) -> TypeId;
    /// Human-readable name of the stored component type.
    fn element_type_name(&self) -> &'static str;
    /// Erased pointer to the value stored for `entity`.
    fn value_ptr(&self, entity: Entity) -> Option<NonNull<u8>>;
    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for Storage<T> {
    fn len(&self) -> usize {
        Storage::len(self)
    }

    fn is_empty(&self) -> bool {
        Storage::is_empty(self)
    }

    fn live_len(&self) -> usize {
        Storage::live_len(self)
    }

    fn capacity(&self) -> usize {
        Storage::capacity(self)
    }

    fn policy(&self) -> DeletionPolicy {
        Storage::policy(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        Storage::contains(self, entity)
    }

    fn index_of(&self, entity: Entity) -> Option<usize> {
        Storage::index_of(self, entity)
    }

    fn at(&self, pos: usize) -> Option<Entity> {
        Storage::at(self, pos)
    }

    fn erase(&mut self, entity: Entity) {
        Storage::erase(self, entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        Storage::remove(self, entity)
    }

    fn clear(&mut self) {
        Storage::clear(self);
    }

    fn compact(&mut self) {
        Storage::compact(self);
    }

    fn reserve(&mut self, capacity: usize) {
        Storage::reserve(self, capacity);
    }

    fn shrink_to_fit(&mut self) {
        Storage::shrink_to_fit(self);
    }

    fn swap_elements(&mut self, a: Entity, b: Entity) {
        Storage::swap_elements(self, a, b);
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn value_ptr(&self, entity: Entity) -> Option<NonNull<u8>> {
        self.get(entity).map(|value| NonNull::from(value).cast())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
