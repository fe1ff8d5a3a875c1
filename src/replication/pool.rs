//! Bounded admission for fan-out tasks.
//!
//! The pool is a long-lived resource owned by one [`Replicator`], shared
//! safely across concurrent orchestration calls: it holds no per-call state,
//! only a fixed number of permits, so the destination count can never grow
//! concurrent upload work past the configured bound.
//!
//! [`Replicator`]: super::Replicator

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{Error, Result};

pub struct ReplicaPool {
    permits: Arc<Semaphore>,
    closed: AtomicBool,
}

impl ReplicaPool {
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            closed: AtomicBool::new(false),
        }
    }

    /// Waits for a free worker slot. The permit is released when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] once the pool has been shut down.
    pub async fn checkout(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Stops accepting new work. Already-checked-out permits stay valid until
    /// their tasks finish. Idempotent.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.permits.close();
            tracing::info!("replica pool shut down");
        }
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
