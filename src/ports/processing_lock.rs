//! ProcessingLock port - mutual exclusion per gateway order.
//!
//! Activation serializes on the order id so that two settlements for the
//! same order can never interleave between the duplicate check and the
//! grant insert. Waiting is bounded; a worker that cannot acquire within
//! the wait reports `LockTimeout`, which is retryable, rather than
//! queueing unboundedly behind a stuck owner.

use std::any::Any;

use async_trait::async_trait;
use thiserror::Error;

/// Lock acquisition failure.
#[derive(Debug, Error)]
pub enum LockError {
    /// The wait bound elapsed before the lock became available.
    #[error("timed out waiting for lock on '{0}'")]
    Timeout(String),
}

/// Held lock; releases on drop.
///
/// The inner box carries whatever the adapter needs to keep the lock
/// alive (e.g. an owned mutex guard) without the port depending on it.
pub struct LockGuard {
    _inner: Box<dyn Any + Send>,
}

impl LockGuard {
    /// Wraps an adapter-specific guard.
    pub fn new(inner: impl Any + Send) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// Port for keyed mutual exclusion.
///
/// Implementations must guarantee that at most one `LockGuard` per key
/// is live at a time, and that a dropped guard releases the key even if
/// the holder's task panicked or was cancelled at an await point.
#[async_trait]
pub trait ProcessingLock: Send + Sync {
    /// Acquires the lock for `key`, waiting up to the adapter's
    /// configured bound.
    async fn acquire(&self, key: &str) -> Result<LockGuard, LockError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn ProcessingLock) {}

    #[test]
    fn timeout_names_the_key() {
        let err = LockError::Timeout("ORD-100".to_string());
        assert_eq!(err.to_string(), "timed out waiting for lock on 'ORD-100'");
    }
}
