//! Replicated blob-write orchestration.
//!
//! The [`Replicator`] decides between the single-destination and
//! multi-replica strategies, fans writes out concurrently over a bounded
//! worker pool, and joins the per-destination outcomes into a
//! [`WriteReport`]. Every destination write is wrapped in the two reliability
//! primitives in fixed order: the per-destination lock is acquired first, and
//! the retry loop runs *inside* the critical section, so retries of a
//! transient failure cannot let a second writer slip in between attempts.
//!
//! A single destination failure never aborts the fan-out: each task's outcome
//! is an explicit `Result`, failures are logged with their destination
//! identity and absorbed, and the failed destination is simply absent from
//! the report's results. The one condition the orchestrator itself treats as
//! fatal is *every* attempted destination failing -
//! [`Error::AllReplicasFailed`] - because "wrote to nothing" can never be a
//! valid outcome.

pub mod pool;
pub mod quorum;
pub mod stats;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinSet};

pub use self::{pool::ReplicaPool, quorum::QuorumPolicy, stats::ReplicaStats};
use crate::{
    checksum, config,
    lock::{LocalLockManager, LockManager},
    registry::{kind, ProviderRegistry},
    retry::{self, RetryPolicy},
    storage::drivers::StoreDriver,
    Error, Result,
};

/// One artifact write, constructed per call and never persisted. The content
/// is a cheaply-cloneable buffer, so every destination (and every retry
/// attempt) gets a fresh, independent view of the bytes.
#[derive(Clone, Debug)]
pub struct WriteRequest {
    pub bucket: String,
    pub key: String,
    pub content: Bytes,
    pub content_type: String,
    /// SHA-256 of the content, when computed via [`Self::with_checksum`].
    pub checksum: Option<String>,
}

impl WriteRequest {
    /// Creates a request for the given destination.
    ///
    /// # Errors
    ///
    /// Fails when the destination key is empty.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::Message(
                "destination key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            bucket: bucket.into(),
            key,
            content: content.into(),
            content_type: "application/octet-stream".to_string(),
            checksum: None,
        })
    }

    /// Reads the artifact from a file on disk.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or the destination key is empty.
    pub async fn from_file(
        bucket: impl Into<String>,
        key: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let content = tokio::fs::read(path.as_ref()).await?;
        Self::new(bucket, key, content)
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Computes the content's SHA-256 so it travels with every replica
    /// result.
    #[must_use]
    pub fn with_checksum(mut self) -> Self {
        self.checksum = Some(checksum::sha256_hex(&self.content));
        self
    }

    /// Actual byte count that will be transferred.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.content.len() as u64
    }

    fn object_path(&self) -> PathBuf {
        PathBuf::from(&self.bucket).join(&self.key)
    }
}

/// Outcome of one destination write. Produced only for destinations that were
/// actually attempted and returned; destinations whose write failed outright
/// are *absent* from the report, not represented as failed entries.
#[derive(Clone, Debug, Serialize)]
pub struct WriteResult {
    pub backend_kind: String,
    pub success: bool,
    /// Where the replica landed; empty when `success` is false.
    pub location: String,
    pub size: u64,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub error_detail: Option<String>,
}

impl WriteResult {
    #[must_use]
    pub fn succeeded(
        backend_kind: String,
        location: String,
        size: u64,
        checksum: Option<String>,
    ) -> Self {
        Self {
            backend_kind,
            success: true,
            location,
            size,
            checksum,
            created_at: Utc::now(),
            error_detail: None,
        }
    }

    #[must_use]
    pub fn failed(backend_kind: String, error_detail: String) -> Self {
        Self {
            backend_kind,
            success: false,
            location: String::new(),
            size: 0,
            checksum: None,
            created_at: Utc::now(),
            error_detail: Some(error_detail),
        }
    }
}

/// One storage backend target for the multi-replica strategy.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReplicaTarget {
    /// Backend kind, resolved through the provider registry.
    pub kind: String,
    /// Disabled targets are skipped without being counted as attempts.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Submission order across targets (lower first). Completion order is
    /// unspecified.
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

/// Joined outcome of one orchestration call: the collected results plus how
/// many destinations were attempted, so quorum and stats can reason about
/// absent (failed) destinations.
#[derive(Debug, Default, Serialize)]
pub struct WriteReport {
    /// One entry per destination that produced a result, in no particular
    /// order.
    pub results: Vec<WriteResult>,
    /// Enabled destinations that were attempted, including those that
    /// produced no result.
    pub attempted: usize,
}

impl WriteReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// A destination-local failure, absorbed at the task boundary.
struct ReplicaFailure {
    backend_kind: String,
    error: Error,
}

/// The replicated write orchestrator.
///
/// Owns the worker pool for its lifetime; concurrent calls share the pool
/// safely (it holds no per-call state). Call [`Self::shutdown`] to stop
/// accepting new writes.
pub struct Replicator {
    registry: ProviderRegistry,
    locks: Arc<dyn LockManager>,
    retry: RetryPolicy,
    pool: ReplicaPool,
    config: config::Replication,
}

impl Replicator {
    /// Creates an orchestrator with a process-local lock manager.
    #[must_use]
    pub fn new(registry: ProviderRegistry, config: config::Replication) -> Self {
        let locks: Arc<dyn LockManager> = Arc::new(LocalLockManager::new(Duration::from_millis(
            config.lock.acquire_timeout_ms,
        )));
        Self::with_lock_manager(registry, config, locks)
    }

    /// Creates an orchestrator with an injected lock manager (e.g. a
    /// distributed one when running more than one instance).
    #[must_use]
    pub fn with_lock_manager(
        registry: ProviderRegistry,
        config: config::Replication,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        Self {
            registry,
            locks,
            retry: config.retry.clone(),
            pool: ReplicaPool::new(config.workers),
            config,
        }
    }

    /// Persists the artifact per the configured strategy and reports the
    /// reconciled outcome.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedBackend`] when the single strategy's backend is
    ///   not registered.
    /// * [`Error::AllReplicasFailed`] when every attempted destination
    ///   failed.
    /// * [`Error::PoolClosed`] after [`Self::shutdown`].
    ///
    /// Destination-local failures (lock timeout, retry exhaustion, provider
    /// errors) in the multi-replica strategy are absorbed and surface only as
    /// absent results.
    pub async fn execute(&self, request: &WriteRequest) -> Result<WriteReport> {
        validate(request)?;
        if self.pool.is_shutdown() {
            return Err(Error::PoolClosed);
        }
        if self.config.multi_replica.enabled {
            self.execute_multi(request, None).await
        } else {
            self.execute_single(request).await
        }
    }

    /// Like [`Self::execute`], but bounds the call by a deadline. In the
    /// multi-replica strategy, destinations still outstanding at the deadline
    /// are cancelled and whatever completed is evaluated by the usual rules.
    ///
    /// # Errors
    ///
    /// As [`Self::execute`]; a fully-stalled fan-out surfaces as
    /// [`Error::AllReplicasFailed`] once the deadline passes.
    pub async fn execute_with_deadline(
        &self,
        request: &WriteRequest,
        deadline: Duration,
    ) -> Result<WriteReport> {
        validate(request)?;
        if self.pool.is_shutdown() {
            return Err(Error::PoolClosed);
        }
        if self.config.multi_replica.enabled {
            self.execute_multi(request, Some(deadline)).await
        } else {
            match tokio::time::timeout(deadline, self.execute_single(request)).await {
                Ok(report) => report,
                Err(_) => Err(Error::Message(format!(
                    "single-replica write exceeded deadline of {deadline:?}"
                ))),
            }
        }
    }

    /// Stops accepting new writes. Replicas already in flight run to
    /// completion and stay in their call's report; a fan-out caught
    /// mid-submission stops submitting further targets. Idempotent.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    /// Single-destination strategy: deterministic backend precedence, exactly
    /// one write.
    async fn execute_single(&self, request: &WriteRequest) -> Result<WriteReport> {
        let backend_kind = if self.config.single.object_store {
            kind::OBJECT_STORE
        } else {
            kind::LOCAL
        };
        let driver = self.registry.resolve(backend_kind)?;

        tracing::info!(
            backend = backend_kind,
            bucket = %request.bucket,
            key = %request.key,
            "executing single-replica store"
        );

        let result = guarded_write(
            backend_kind.to_string(),
            driver,
            Arc::clone(&self.locks),
            self.retry.clone(),
            request.clone(),
        )
        .await?;

        Ok(WriteReport {
            results: vec![result],
            attempted: 1,
        })
    }

    /// Multi-replica strategy: best-effort fan-out, evaluate afterwards.
    async fn execute_multi(
        &self,
        request: &WriteRequest,
        deadline: Option<Duration>,
    ) -> Result<WriteReport> {
        let mut targets: Vec<ReplicaTarget> = Vec::new();
        for target in &self.config.multi_replica.replicas {
            if !target.enabled {
                tracing::debug!(backend = %target.kind, "skipping disabled replica");
                continue;
            }
            targets.push(target.clone());
        }
        // Stable sort: ties keep their configured order.
        targets.sort_by_key(|t| t.priority);

        if targets.is_empty() {
            tracing::warn!(
                bucket = %request.bucket,
                key = %request.key,
                "multi-replica store has no enabled targets"
            );
            return Ok(WriteReport::default());
        }

        tracing::info!(
            total = targets.len(),
            bucket = %request.bucket,
            key = %request.key,
            "executing multi-replica store"
        );

        let mut join_set: JoinSet<std::result::Result<WriteResult, ReplicaFailure>> =
            JoinSet::new();
        let mut attempted = 0usize;
        let mut submitted = 0usize;
        let mut pool_closed = false;
        let mut results = Vec::with_capacity(targets.len());

        // Submission and join run under one deadline: a saturated pool must
        // not stall the call past it.
        let run = async {
            for target in targets {
                let driver = match self.registry.resolve(&target.kind) {
                    Ok(driver) => driver,
                    Err(error) => {
                        // An unresolvable target is still an attempted one: it
                        // fails like any other destination, without aborting
                        // the fan-out.
                        attempted += 1;
                        tracing::error!(backend = %target.kind, %error, "replica store failed");
                        continue;
                    }
                };
                let permit = match self.pool.checkout().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // Shutdown raced this fan-out. Stop submitting, but
                        // keep the replicas already in flight: a landed write
                        // must always be reported.
                        pool_closed = true;
                        tracing::warn!(
                            backend = %target.kind,
                            "pool shut down mid fan-out, no further replicas submitted"
                        );
                        break;
                    }
                };
                attempted += 1;
                submitted += 1;

                let backend_kind = target.kind.to_lowercase();
                let locks = Arc::clone(&self.locks);
                let retry = self.retry.clone();
                let request = request.clone();
                join_set.spawn(async move {
                    let _permit = permit;
                    guarded_write(backend_kind.clone(), driver, locks, retry, request)
                        .await
                        .map_err(|error| ReplicaFailure {
                            backend_kind,
                            error,
                        })
                });
            }

            while let Some(outcome) = join_set.join_next().await {
                absorb(&mut results, outcome);
            }
        };

        match deadline {
            None => run.await,
            Some(deadline) => {
                if tokio::time::timeout(deadline, run).await.is_err() {
                    tracing::warn!(
                        deadline_ms = deadline.as_millis() as u64,
                        "write deadline reached, cancelling outstanding replicas"
                    );
                    join_set.abort_all();
                    // Replicas that finished before the deadline still count.
                    while let Some(outcome) = join_set.join_next().await {
                        absorb(&mut results, outcome);
                    }
                }
            }
        }

        tracing::info!(
            succeeded = results.len(),
            submitted,
            bucket = %request.bucket,
            key = %request.key,
            "multi-replica store finished"
        );

        if results.is_empty() {
            if pool_closed && attempted == 0 {
                return Err(Error::PoolClosed);
            }
            return Err(Error::AllReplicasFailed { attempted });
        }

        Ok(WriteReport { results, attempted })
    }
}

/// Folds one joined task outcome into the collected results; failures are
/// logged with their destination identity and absorbed.
fn absorb(
    results: &mut Vec<WriteResult>,
    outcome: std::result::Result<std::result::Result<WriteResult, ReplicaFailure>, JoinError>,
) {
    match outcome {
        Ok(Ok(result)) => results.push(result),
        Ok(Err(failure)) => {
            tracing::error!(
                backend = %failure.backend_kind,
                error = %failure.error,
                "replica store failed"
            );
        }
        Err(join_error) if join_error.is_cancelled() => {
            tracing::debug!("replica task cancelled at deadline");
        }
        Err(join_error) => {
            tracing::error!(error = %join_error, "replica task panicked");
        }
    }
}

fn validate(request: &WriteRequest) -> Result<()> {
    if request.key.is_empty() {
        return Err(Error::Message(
            "destination key must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// One destination write wrapped in the two reliability primitives, in fixed
/// order: lock first, retry inside the critical section. The lease is
/// released on every exit path by dropping.
async fn guarded_write(
    backend_kind: String,
    driver: Arc<dyn StoreDriver>,
    locks: Arc<dyn LockManager>,
    retry: RetryPolicy,
    request: WriteRequest,
) -> Result<WriteResult> {
    let lock_key = format!(
        "storage:{}:{}:{}",
        backend_kind, request.bucket, request.key
    );
    let _lease = locks.acquire(&lock_key).await?;

    let path = request.object_path();
    retry::execute(&retry, || driver.upload(&path, &request.content)).await?;

    let location = format!("{}://{}/{}", backend_kind, request.bucket, request.key);
    Ok(WriteResult::succeeded(
        backend_kind,
        location,
        request.content_length(),
        request.checksum.clone(),
    ))
}
