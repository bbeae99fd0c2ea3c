//! Error types for fallible pool insertion.
//!
//! This module declares the error type used by the fallible half of the pool
//! API. It carries enough context to make failures actionable while remaining
//! small and cheap to pass around.
//!
//! ## Goals
//! * **Specificity:** The error models a single failure mode — an insertion
//!   targeting an entity the pool already stores.
//! * **Ergonomics:** It implements [`std::error::Error`] and [`fmt::Display`]
//!   for use with `?` and error-reporting stacks.
//! * **Predicates stay predicates:** operations whose failure is part of
//!   normal control flow signal it without an error channel — `push` returns
//!   `Option`, `remove` returns `bool`, `get`/`take` return `Option`. An
//!   absent entity is never an error value; contract violations panic.
//!
//! ## Typical flow
//! Fallible insertions return the error; orchestration code bubbles it up
//! with `?`:
//!
//! ```rust
//! use sparse_pool::prelude::*;
//! use sparse_pool::AlreadyPresentError;
//!
//! fn attach(pool: &mut Storage<u32>, entities: &[Entity]) -> Result<(), AlreadyPresentError> {
//!     pool.try_insert(entities, &0)?;
//!     Ok(())
//! }
//! ```

use std::fmt;

use crate::engine::entity::Entity;

/// Returned when an insertion targets an entity the pool already stores.
///
/// Produced by [`try_emplace`](crate::engine::storage::Storage::try_emplace)
/// and [`try_insert`](crate::engine::storage::Storage::try_insert).
///
/// ### Fields
/// * `entity` — The offending entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyPresentError {
    /// Entity that is already stored in the pool.
    pub entity: Entity,
}

impl fmt::Display for AlreadyPresentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {:?} is already stored in the pool", self.entity)
    }
}

impl std::error::Error for AlreadyPresentError {}
