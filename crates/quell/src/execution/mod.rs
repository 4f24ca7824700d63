//! Execution strategies and the shared per-field resolution they drive.
//!
//! One logical future exists per field and per list element, composed into a tree matching the
//! query shape. Failures travel as a typed [`Interrupt`] rather than a panic: null propagation
//! collapses at the nearest nullable position, an abort short-circuits the whole operation.

mod abstract_type;
mod field;
mod list;
mod non_null;
mod strategy;

pub use strategy::{BoundedStrategy, Concurrency, ConcurrentStrategy, ExecutionStrategy, SerialStrategy};

use crate::error::ServerError;

/// Non-local control flow of execution.
///
/// `PropagateNull` is not a user-facing error by itself: the offending position already recorded
/// exactly one error before raising it. It travels up until a nullable position absorbs it by
/// resolving to null; past the operation root, the whole `data` is null.
#[derive(Debug)]
pub enum Interrupt {
    /// A non-null position resolved to null; collapse at the nearest nullable ancestor.
    PropagateNull,
    /// Stop the whole operation. The carried errors go into the response as-is.
    Abort(Vec<ServerError>),
}

pub type ExecutionResult<T> = Result<T, Interrupt>;
