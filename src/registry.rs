//! Backend-kind registry.
//!
//! Maps a backend-kind identifier (lower-cased string) to a storage driver
//! instance. The registry is built once at startup and is a pure lookup
//! afterwards; unknown kinds fail with [`Error::UnsupportedBackend`].

use std::{collections::BTreeMap, sync::Arc};

use crate::{storage::drivers::StoreDriver, Error, Result};

/// Well-known backend-kind identifiers.
pub mod kind {
    /// S3-compatible object store (AWS S3, MinIO, OSS, COS).
    pub const OBJECT_STORE: &str = "s3";
    /// Local filesystem.
    pub const LOCAL: &str = "local";
    /// In-memory store.
    pub const MEMORY: &str = "mem";
    /// Placeholder store that rejects every operation.
    pub const NULL: &str = "null";
    #[cfg(feature = "storage_azure")]
    /// Azure Blob storage.
    pub const AZURE: &str = "azure";
    #[cfg(feature = "storage_gcp")]
    /// Google Cloud Storage.
    pub const GCS: &str = "gcs";
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn StoreDriver>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver under the given backend kind. Kinds are
    /// case-insensitive; registering the same kind twice keeps the last
    /// driver.
    pub fn register(&mut self, backend_kind: &str, driver: Arc<dyn StoreDriver>) {
        self.providers
            .insert(backend_kind.to_lowercase(), driver);
    }

    /// Resolves the driver registered for the given backend kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBackend`] when no driver is registered for
    /// the kind.
    pub fn resolve(&self, backend_kind: &str) -> Result<Arc<dyn StoreDriver>> {
        self.providers
            .get(&backend_kind.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnsupportedBackend(backend_kind.to_string()))
    }

    /// The registered backend kinds, in lexical order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}
