use std::sync::{MutexGuard, PoisonError, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

/// Errors surfaced by a [`DocumentStore`](crate::contracts::DocumentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("commit conflict on {collection}/{key}: {reason}")]
    Conflict {
        collection: String,
        key: String,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors surfaced to the order-creation caller.
///
/// Counter resync failures never appear here: they are swallowed at the
/// allocator boundary (logged only) so administrative maintenance can never
/// block a customer-facing flow.
#[derive(Error, Debug)]
pub enum AllocatorError {
    /// The allocation transaction could not commit within the retry budget.
    /// The caller must not assume an order was created or an identifier was
    /// consumed; the whole submission is safe to reattempt.
    #[error("allocation failed after {attempts} attempts: {reason}")]
    AllocationFailed { attempts: usize, reason: String },

    /// The durable store could not be reached at all.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Extension trait for converting lock errors to StoreError.
pub trait LockResultExt<T> {
    /// Converts a lock error to a StoreError.
    fn map_lock_err(self) -> Result<T, StoreError>;
}

impl<'a, T> LockResultExt<RwLockReadGuard<'a, T>>
    for Result<RwLockReadGuard<'a, T>, PoisonError<RwLockReadGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockReadGuard<'a, T>, StoreError> {
        self.map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl<'a, T> LockResultExt<RwLockWriteGuard<'a, T>>
    for Result<RwLockWriteGuard<'a, T>, PoisonError<RwLockWriteGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
        self.map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl<'a, T> LockResultExt<MutexGuard<'a, T>>
    for Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<MutexGuard<'a, T>, StoreError> {
        self.map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}
