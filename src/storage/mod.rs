//! Uniform storage capability over pluggable backends.
//!
//! This module defines the [`drivers::StoreDriver`] boundary that every backend
//! kind implements once (in-memory, local filesystem, and the feature-gated
//! cloud object stores). The replication layer only ever talks to this trait;
//! backend transport details live inside `opendal`.

pub mod drivers;
pub mod error;

pub use error::{StorageError, StorageResult};
