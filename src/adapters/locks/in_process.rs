//! In-process per-key lock map.
//!
//! One async mutex per key, handed out through the `ProcessingLock`
//! port. Sufficient for a single-instance deployment; a multi-instance
//! deployment would put a distributed lock behind the same port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::ports::{LockError, LockGuard, ProcessingLock};

/// In-process implementation of `ProcessingLock`.
///
/// Key entries are never removed; the map grows with the set of order
/// ids seen since startup, which is bounded by order volume.
pub struct InProcessLockMap {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    wait: Duration,
}

impl InProcessLockMap {
    /// Creates a lock map with the given acquisition wait bound.
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait,
        }
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("InProcessLockMap: map poisoned");
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

#[async_trait]
impl ProcessingLock for InProcessLockMap {
    async fn acquire(&self, key: &str) -> Result<LockGuard, LockError> {
        let mutex = self.entry(key);
        let guard = tokio::time::timeout(self.wait, mutex.lock_owned())
            .await
            .map_err(|_| LockError::Timeout(key.to_string()))?;
        Ok(LockGuard::new(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_acquires_succeed() {
        let locks = InProcessLockMap::new(Duration::from_millis(100));

        let guard = locks.acquire("ORD-100").await.unwrap();
        drop(guard);
        locks.acquire("ORD-100").await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = InProcessLockMap::new(Duration::from_millis(100));

        let _a = locks.acquire("ORD-100").await.unwrap();
        let _b = locks.acquire("ORD-200").await.unwrap();
    }

    #[tokio::test]
    async fn held_lock_times_out_second_acquirer() {
        let locks = InProcessLockMap::new(Duration::from_millis(50));

        let _held = locks.acquire("ORD-100").await.unwrap();
        let result = locks.acquire("ORD-100").await;

        assert!(matches!(result, Err(LockError::Timeout(_))));
    }

    #[tokio::test]
    async fn dropping_the_guard_releases_the_key() {
        let locks = Arc::new(InProcessLockMap::new(Duration::from_millis(500)));

        let guard = locks.acquire("ORD-100").await.unwrap();
        let locks2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move { locks2.acquire("ORD-100").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert!(waiter.await.unwrap().is_ok());
    }
}
