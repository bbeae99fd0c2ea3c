//! # Component Storage Traits
//!
//! This module defines the per-type compile-time knobs a component exposes to
//! its storage, and the deletion policy derived from them.
//!
//! ## Purpose
//! A pool needs two facts about its value type before the first insertion:
//!
//! - whether erasing a value may move another one (swap-and-pop) or must
//!   leave every other value in place (in-place deletion with tombstones),
//! - how many value slots a dense page holds.
//!
//! Both are compile-time constants of the [`Component`] implementation, so a
//! pool's policy is fixed at construction and never consulted per element.
//!
//! ## Defaults
//! Swap-and-pop deletion and a page of [`DEFAULT_PAGE_SIZE`] slots. Types
//! that hand out long-lived references opt into in-place deletion; types
//! iterated in tight loops may shrink the page to match their working set.

use crate::engine::types::DEFAULT_PAGE_SIZE;

/// Per-type storage traits consumed by a pool.
///
/// ## Purpose
/// Declares how values of the implementing type are stored and erased.
///
/// ## Notes
/// The crate implements `Component` for the primitive scalar types and
/// `String` with the default traits. User types opt in explicitly:
///
/// ```rust
/// use sparse_pool::prelude::*;
///
/// struct Stable(u32);
///
/// impl Component for Stable {
///     const IN_PLACE_DELETE: bool = true;
/// }
/// ```
pub trait Component: Sized + 'static {
    /// When `true`, erasure destroys the value in place and leaves a
    /// tombstone instead of back-filling from the tail.
    const IN_PLACE_DELETE: bool = false;

    /// Number of value slots per dense page. Must be non-zero.
    const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE;
}

macro_rules! impl_component_defaults {
    ($($type:ty),* $(,)?) => {
        $(impl Component for $type {})*
    };
}

impl_component_defaults! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, String,
}

/// Deletion policy of a pool, fixed at construction.
///
/// ## Purpose
/// Selects between the two erase strategies the sparse set supports. For a
/// typed pool the policy is derived from the component's traits; a standalone
/// entity set picks one explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Erase moves the last live element into the vacated slot and shrinks
    /// the packed array. No tombstones ever exist.
    SwapAndPop,

    /// Erase destroys the value in place and leaves a tombstone; dense
    /// positions of other entities never change.
    InPlace,
}

impl DeletionPolicy {
    /// Derives the policy from a component's storage traits.
    #[inline]
    pub fn of<T: Component>() -> Self {
        if T::IN_PLACE_DELETE {
            DeletionPolicy::InPlace
        } else {
            DeletionPolicy::SwapAndPop
        }
    }
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        DeletionPolicy::SwapAndPop
    }
}
