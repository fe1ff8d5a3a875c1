//! End-to-end orchestration scenarios: fan-out, partial failure, quorum,
//! retry, mutual exclusion, deadlines, and shutdown.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use blobvault::{
    config::{Lock, MultiReplica, Replication},
    registry::ProviderRegistry,
    replication::{QuorumPolicy, ReplicaStats, ReplicaTarget, Replicator, WriteRequest},
    retry::RetryPolicy,
    storage::{
        drivers::{self, GetResponse, StoreDriver, UploadResponse},
        StorageError, StorageResult,
    },
    Error,
};
use bytes::Bytes;

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff_ms: 1,
        multiplier: 1.0,
        max_backoff_ms: 1,
    }
}

fn multi_config(replicas: Vec<ReplicaTarget>) -> Replication {
    Replication {
        multi_replica: MultiReplica {
            enabled: true,
            replicas,
        },
        retry: fast_retry(3),
        lock: Lock {
            acquire_timeout_ms: 2_000,
        },
        ..Replication::default()
    }
}

fn target(kind: &str, priority: i32) -> ReplicaTarget {
    ReplicaTarget {
        kind: kind.to_string(),
        enabled: true,
        priority,
    }
}

fn request() -> WriteRequest {
    WriteRequest::new("backups", "nightly/db.dump", "file content")
        .unwrap()
        .with_checksum()
}

/// Fails the first `failures` uploads, then delegates.
struct FlakyDriver {
    inner: Arc<dyn StoreDriver>,
    failures: u32,
    attempts: AtomicU32,
}

impl FlakyDriver {
    fn new(inner: Arc<dyn StoreDriver>, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failures,
            attempts: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl StoreDriver for FlakyDriver {
    async fn upload(&self, path: &Path, content: &Bytes) -> StorageResult<UploadResponse> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(StorageError::Any("transient upload failure".into()));
        }
        self.inner.upload(path, content).await
    }

    async fn get(&self, path: &Path) -> StorageResult<GetResponse> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &Path) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

/// Writes immediately, then keeps its worker slot busy for `hold`.
struct SlowReleaseDriver {
    inner: Arc<dyn StoreDriver>,
    hold: Duration,
}

#[async_trait]
impl StoreDriver for SlowReleaseDriver {
    async fn upload(&self, path: &Path, content: &Bytes) -> StorageResult<UploadResponse> {
        let response = self.inner.upload(path, content).await?;
        tokio::time::sleep(self.hold).await;
        Ok(response)
    }

    async fn get(&self, path: &Path) -> StorageResult<GetResponse> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &Path) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

/// Never completes an upload within any realistic deadline.
struct StallDriver;

#[async_trait]
impl StoreDriver for StallDriver {
    async fn upload(&self, _path: &Path, _content: &Bytes) -> StorageResult<UploadResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(StorageError::Any("stalled".into()))
    }

    async fn get(&self, _path: &Path) -> StorageResult<GetResponse> {
        Err(StorageError::Any("stalled".into()))
    }

    async fn delete(&self, _path: &Path) -> StorageResult<()> {
        Err(StorageError::Any("stalled".into()))
    }

    async fn exists(&self, _path: &Path) -> StorageResult<bool> {
        Ok(false)
    }
}

/// Detects concurrent uploads to the same path.
struct OverlapProbe {
    inner: Arc<dyn StoreDriver>,
    in_flight: Mutex<HashSet<PathBuf>>,
    overlapped: AtomicBool,
}

impl OverlapProbe {
    fn new(inner: Arc<dyn StoreDriver>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            in_flight: Mutex::new(HashSet::new()),
            overlapped: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl StoreDriver for OverlapProbe {
    async fn upload(&self, path: &Path, content: &Bytes) -> StorageResult<UploadResponse> {
        if !self.in_flight.lock().unwrap().insert(path.to_path_buf()) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = self.inner.upload(path, content).await;
        self.in_flight.lock().unwrap().remove(path);
        result
    }

    async fn get(&self, path: &Path) -> StorageResult<GetResponse> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &Path) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

/// Records the order in which uploads start.
struct RecordingDriver {
    inner: Arc<dyn StoreDriver>,
    name: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingDriver {
    fn new(
        inner: Arc<dyn StoreDriver>,
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<Self> {
        Arc::new(Self { inner, name, order })
    }
}

#[async_trait]
impl StoreDriver for RecordingDriver {
    async fn upload(&self, path: &Path, content: &Bytes) -> StorageResult<UploadResponse> {
        self.order.lock().unwrap().push(self.name);
        self.inner.upload(path, content).await
    }

    async fn get(&self, path: &Path) -> StorageResult<GetResponse> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &Path) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

#[tokio::test]
async fn fan_out_to_all_enabled_targets() {
    let stores: Vec<_> = (0..3).map(|_| drivers::mem::new().unwrap()).collect();
    let mut registry = ProviderRegistry::new();
    for (i, store) in stores.iter().enumerate() {
        registry.register(&format!("mem-{i}"), store.clone());
    }

    let replicator = Replicator::new(
        registry,
        multi_config(vec![
            target("mem-0", 1),
            target("mem-1", 2),
            target("mem-2", 3),
        ]),
    );
    let request = request();

    let report = replicator.execute(&request).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.success_count(), 3);
    assert!(QuorumPolicy::default().validate(&report));

    let stats = ReplicaStats::collect(&report);
    assert_eq!(stats.total_replicas, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total_bytes, 3 * "file content".len() as u64);

    let path = PathBuf::from("backups").join("nightly/db.dump");
    for store in &stores {
        assert!(store.exists(&path).await.unwrap());
        assert_eq!(
            store.get(&path).await.unwrap().bytes().await.unwrap(),
            Bytes::from("file content")
        );
    }
}

#[tokio::test]
async fn partial_failure_is_absorbed_and_fails_quorum() {
    let good = drivers::mem::new().unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register("mem", good.clone());
    registry.register("null-a", drivers::null::new());
    registry.register("null-b", drivers::null::new());

    let replicator = Replicator::new(
        registry,
        multi_config(vec![
            target("mem", 1),
            target("null-a", 2),
            target("null-b", 3),
        ]),
    );

    let report = replicator.execute(&request()).await.unwrap();

    // One success out of three attempted: below the majority threshold.
    assert_eq!(report.attempted, 3);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].backend_kind, "mem");
    assert!(!QuorumPolicy::default().validate(&report));

    let stats = ReplicaStats::collect(&report);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 2);
    assert!((stats.success_ratio - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn total_failure_is_fatal() {
    let mut registry = ProviderRegistry::new();
    registry.register("null-a", drivers::null::new());
    registry.register("null-b", drivers::null::new());

    let replicator = Replicator::new(
        registry,
        multi_config(vec![target("null-a", 1), target("null-b", 2)]),
    );

    let err = replicator.execute(&request()).await.unwrap_err();
    assert!(matches!(err, Error::AllReplicasFailed { attempted: 2 }));
}

#[tokio::test]
async fn unresolvable_target_counts_as_attempted() {
    let mut registry = ProviderRegistry::new();
    registry.register("mem", drivers::mem::new().unwrap());

    let replicator = Replicator::new(
        registry,
        multi_config(vec![target("mem", 1), target("tape", 2)]),
    );

    let report = replicator.execute(&request()).await.unwrap();

    assert_eq!(report.attempted, 2);
    assert_eq!(report.results.len(), 1);
    // 1 of 2: exactly at the majority threshold, inclusive.
    assert!(QuorumPolicy::default().validate(&report));
}

#[tokio::test]
async fn retry_recovers_transient_failures() {
    let flaky = FlakyDriver::new(drivers::mem::new().unwrap(), 2);
    let mut registry = ProviderRegistry::new();
    registry.register("flaky", flaky.clone());

    let replicator = Replicator::new(registry, multi_config(vec![target("flaky", 1)]));

    let report = replicator.execute(&request()).await.unwrap();

    assert_eq!(report.success_count(), 1);
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_exhaustion_fails_the_destination() {
    let flaky = FlakyDriver::new(drivers::mem::new().unwrap(), 5);
    let mut registry = ProviderRegistry::new();
    registry.register("flaky", flaky.clone());

    let replicator = Replicator::new(registry, multi_config(vec![target("flaky", 1)]));

    let err = replicator.execute(&request()).await.unwrap_err();

    assert!(matches!(err, Error::AllReplicasFailed { attempted: 1 }));
    // max_attempts bounds the tries; no further attempt after exhaustion.
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn concurrent_writes_to_same_destination_never_overlap() {
    let probe = OverlapProbe::new(drivers::mem::new().unwrap());
    let mut registry = ProviderRegistry::new();
    registry.register("mem", probe.clone());

    let replicator = Arc::new(Replicator::new(
        registry,
        multi_config(vec![target("mem", 1)]),
    ));
    let request = request();

    let writes: Vec<_> = (0..4)
        .map(|_| {
            let replicator = Arc::clone(&replicator);
            let request = request.clone();
            tokio::spawn(async move { replicator.execute(&request).await })
        })
        .collect();
    for write in writes {
        assert!(write.await.unwrap().is_ok());
    }

    assert!(!probe.overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn submission_follows_priority_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ProviderRegistry::new();
    registry.register(
        "second",
        RecordingDriver::new(drivers::mem::new().unwrap(), "second", order.clone()),
    );
    registry.register(
        "first",
        RecordingDriver::new(drivers::mem::new().unwrap(), "first", order.clone()),
    );

    // One worker makes submission order observable: declared out of priority
    // order on purpose.
    let config = Replication {
        workers: 1,
        ..multi_config(vec![target("second", 2), target("first", 1)])
    };
    let replicator = Replicator::new(registry, config);

    let report = replicator.execute(&request()).await.unwrap();

    assert_eq!(report.success_count(), 2);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn deadline_cancels_stalled_replicas_and_keeps_completed_ones() {
    let mut registry = ProviderRegistry::new();
    registry.register("mem", drivers::mem::new().unwrap());
    registry.register("stall", Arc::new(StallDriver));

    let replicator = Replicator::new(
        registry,
        multi_config(vec![target("mem", 1), target("stall", 2)]),
    );

    let report = replicator
        .execute_with_deadline(&request(), Duration::from_secs(1))
        .await
        .unwrap();

    // The stalled destination was attempted but produced no result.
    assert_eq!(report.attempted, 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].backend_kind, "mem");
    assert!(QuorumPolicy::default().validate(&report));
}

#[tokio::test(start_paused = true)]
async fn fully_stalled_fan_out_fails_at_the_deadline() {
    let mut registry = ProviderRegistry::new();
    registry.register("stall-a", Arc::new(StallDriver));
    registry.register("stall-b", Arc::new(StallDriver));

    let replicator = Replicator::new(
        registry,
        multi_config(vec![target("stall-a", 1), target("stall-b", 2)]),
    );

    let err = replicator
        .execute_with_deadline(&request(), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AllReplicasFailed { attempted: 2 }));
}

#[tokio::test]
async fn shutdown_rejects_new_writes() {
    let mut registry = ProviderRegistry::new();
    registry.register("mem", drivers::mem::new().unwrap());

    let replicator = Replicator::new(registry, multi_config(vec![target("mem", 1)]));

    assert!(replicator.execute(&request()).await.is_ok());

    replicator.shutdown();
    replicator.shutdown(); // idempotent

    assert!(replicator.is_shutdown());
    let err = replicator.execute(&request()).await.unwrap_err();
    assert!(matches!(err, Error::PoolClosed));
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_fan_out_keeps_landed_replicas() {
    let store = drivers::mem::new().unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register(
        "slow",
        Arc::new(SlowReleaseDriver {
            inner: store.clone(),
            hold: Duration::from_millis(300),
        }),
    );
    registry.register("mem", drivers::mem::new().unwrap());

    // One worker: the second target is still queued behind the first when
    // shutdown lands.
    let config = Replication {
        workers: 1,
        ..multi_config(vec![target("slow", 1), target("mem", 2)])
    };
    let replicator = Arc::new(Replicator::new(registry, config));

    let call = {
        let replicator = Arc::clone(&replicator);
        let request = request();
        tokio::spawn(async move { replicator.execute(&request).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    replicator.shutdown();

    // The replica written before shutdown must be reported, not dropped.
    let report = call.await.unwrap().unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].backend_kind, "slow");
    assert_eq!(report.attempted, 1);

    let path = PathBuf::from("backups").join("nightly/db.dump");
    assert!(store.exists(&path).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_submission_when_pool_is_saturated() {
    let mut registry = ProviderRegistry::new();
    registry.register("stall-a", Arc::new(StallDriver));
    registry.register("stall-b", Arc::new(StallDriver));

    // The only worker slot is stalled, so the second target never leaves the
    // submission queue; the deadline must still bound the whole call.
    let config = Replication {
        workers: 1,
        ..multi_config(vec![target("stall-a", 1), target("stall-b", 2)])
    };
    let replicator = Replicator::new(registry, config);

    let err = replicator
        .execute_with_deadline(&request(), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AllReplicasFailed { attempted: 1 }));
}

#[tokio::test]
async fn checksum_matches_stored_content() {
    let store = drivers::mem::new().unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register("mem", store.clone());

    let replicator = Replicator::new(registry, multi_config(vec![target("mem", 1)]));
    let request = request();

    let report = replicator.execute(&request).await.unwrap();

    let path = PathBuf::from("backups").join("nightly/db.dump");
    let stored = store.get(&path).await.unwrap().bytes().await.unwrap();
    let digest = report.results[0].checksum.clone().unwrap();
    assert!(blobvault::checksum::verify(&stored, &digest));
}

#[tokio::test]
async fn write_request_from_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("db.dump");
    tokio::fs::write(&artifact, b"dump bytes").await.unwrap();

    let store = drivers::mem::new().unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register("mem", store.clone());

    let replicator = Replicator::new(registry, multi_config(vec![target("mem", 1)]));
    let request = WriteRequest::from_file("backups", "nightly/db.dump", &artifact)
        .await
        .unwrap();

    replicator.execute(&request).await.unwrap();

    let path = PathBuf::from("backups").join("nightly/db.dump");
    assert_eq!(
        store.get(&path).await.unwrap().bytes().await.unwrap(),
        Bytes::from_static(b"dump bytes")
    );
}
