#![allow(clippy::module_name_repetitions)]
//! Replicated blob-write orchestration for backup artifacts.
//!
//! `blobvault` durably persists a locally-produced artifact (typically a backup
//! file) to one or more independent storage backends, tolerating partial
//! backend failure and reporting a reconciled outcome. Every destination write
//! is guarded by per-destination mutual exclusion and retry-with-backoff; the
//! caller decides afterwards whether "enough" replicas landed via an explicit
//! quorum check.
//!
//! ```rust,no_run
//! use blobvault::{config, registry::{kind, ProviderRegistry}, replication, storage::drivers};
//!
//! # async fn run() -> blobvault::Result<()> {
//! let mut registry = ProviderRegistry::new();
//! registry.register(kind::LOCAL, drivers::local::new_with_prefix("/var/backups")?);
//!
//! let replication = config::Replication::default();
//! let quorum = replication.quorum.clone();
//! let replicator = replication::Replicator::new(registry, replication);
//!
//! let request = replication::WriteRequest::from_file("db-backups", "nightly/db.dump", "/tmp/db.dump")
//!     .await?
//!     .with_checksum();
//! let report = replicator.execute(&request).await?;
//!
//! if !quorum.validate(&report) {
//!     // partial success below policy - up to the caller what to do with it
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Available Features
//!
//! To avoid compiling unused storage backends, cloud drivers are gated.
//!
//! | Feature          | Default | Description               |
//! |------------------|---------|---------------------------|
//! | `storage_aws_s3` | false   | S3-compatible driver.     |
//! | `storage_azure`  | false   | Azure Blob driver.        |
//! | `storage_gcp`    | false   | Google Cloud Storage.     |
//! | `all_storage`    | false   | All of the above.         |
pub use self::errors::Error;

pub mod checksum;
pub mod config;
pub mod errors;
pub mod lock;
pub mod logger;
pub mod registry;
pub mod replication;
pub mod retry;
pub mod storage;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
