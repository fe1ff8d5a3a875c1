//! Per-destination mutual exclusion.
//!
//! A [`LockManager`] hands out [`Lease`]s scoped to a string key; at most one
//! lease per key is live at any time, and dropping the lease releases the
//! lock. The replication layer derives its keys per (backend, destination)
//! pair, so the same logical content going to two different backends is two
//! independent critical sections.
//!
//! [`LocalLockManager`] is process-local, which is sufficient for a
//! single-instance deployment. Running the orchestrator in more than one
//! process requires a distributed implementation of the same trait.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::{Error, Result};

/// Held for the duration of one guarded write; dropping it releases the lock.
pub trait Lease: Send {}

impl<T: Send> Lease for T {}

impl std::fmt::Debug for dyn Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Lease")
    }
}

#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquires the lock for `key`, waiting up to the manager's configured
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] when the lock cannot be acquired in
    /// time.
    async fn acquire(&self, key: &str) -> Result<Box<dyn Lease>>;
}

type LockMap = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Process-local lock manager over a keyed map of async mutexes.
///
/// Keys are typically per-backup (timestamped), so a released key's map entry
/// is removed rather than kept for reuse; the map holds only keys with a live
/// holder or waiter.
pub struct LocalLockManager {
    acquire_timeout: Duration,
    locks: LockMap,
}

impl LocalLockManager {
    #[must_use]
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            acquire_timeout,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entry(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(key.to_string()).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().expect("lock map poisoned").len()
    }
}

/// Releases the lock on drop, and removes the key's map entry once no holder
/// or waiter references it anymore.
struct LocalLease {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: LockMap,
}

impl Drop for LocalLease {
    fn drop(&mut self) {
        // Release the mutex first so the refcount reflects only the map entry
        // plus any waiters.
        self.guard.take();
        let mut locks = self.locks.lock().expect("lock map poisoned");
        if locks
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(&self, key: &str) -> Result<Box<dyn Lease>> {
        let mutex = self.entry(key);
        let guard = tokio::time::timeout(self.acquire_timeout, mutex.lock_owned())
            .await
            .map_err(|_| Error::LockTimeout(key.to_string()))?;
        Ok(Box::new(LocalLease {
            guard: Some(guard),
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        }))
    }
}
