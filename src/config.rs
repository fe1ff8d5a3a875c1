//! Configuration loading, parsed from YAML.
//!
//! Everything the orchestrator needs at construction time lives here:
//! strategy selection, replica targets, retry and lock tuning, quorum
//! threshold, and the worker pool size. All fields carry serde defaults so a
//! minimal file (or an empty one) yields a working single-replica setup.
//!
//! Example (config/replication.yaml):
//!
//! ```yaml
//! logger:
//!   enable: true
//!   level: info
//! replication:
//!   multi_replica:
//!     enabled: true
//!     replicas:
//!       - kind: s3
//!         priority: 1
//!       - kind: local
//!         priority: 2
//!   retry:
//!     max_attempts: 3
//!     initial_backoff_ms: 100
//!   quorum:
//!     threshold: 0.5
//!   workers: 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    logger,
    replication::{QuorumPolicy, ReplicaTarget},
    retry::RetryPolicy,
    Result,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logger: Logger,
    #[serde(default)]
    pub replication: Replication,
    /// Free-form, application-specific settings.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Logger {
    /// Enable log emission at init time.
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub level: logger::LogLevel,
    #[serde(default)]
    pub format: logger::Format,
    /// Overrides the crate-scoped filter with a raw tracing directive.
    #[serde(default)]
    pub override_filter: Option<String>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            enable: true,
            level: logger::LogLevel::default(),
            format: logger::Format::default(),
            override_filter: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Replication {
    #[serde(default)]
    pub multi_replica: MultiReplica,
    #[serde(default)]
    pub single: SingleReplica,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub lock: Lock,
    #[serde(default)]
    pub quorum: QuorumPolicy,
    /// Upper bound on concurrent destination writes.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for Replication {
    fn default() -> Self {
        Self {
            multi_replica: MultiReplica::default(),
            single: SingleReplica::default(),
            retry: RetryPolicy::default(),
            lock: Lock::default(),
            quorum: QuorumPolicy::default(),
            workers: default_workers(),
        }
    }
}

/// Multi-replica strategy: fan out to every enabled target.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MultiReplica {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub replicas: Vec<ReplicaTarget>,
}

/// Single-destination strategy, used when multi-replica is off.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SingleReplica {
    /// Prefer the object store backend over local storage.
    #[serde(default)]
    pub object_store: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Lock {
    #[serde(default = "default_lock_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for Lock {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    10
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not parse.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        tracing::debug!(path = %path.as_ref().display(), "loading configuration");
        Self::from_str(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Fails when the content does not parse.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
