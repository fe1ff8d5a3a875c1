use std::sync::Arc;

use opendal::{services::Gcs, Operator};

use super::{opendal_adapter::OpendalAdapter, StoreDriver};
use crate::storage::StorageResult;

/// Create new GCP storage.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(bucket_name: &str, credential_path: &str) -> StorageResult<Arc<dyn StoreDriver>> {
    let gcs = Gcs::default()
        .bucket(bucket_name)
        .credential_path(credential_path);
    Ok(Arc::new(OpendalAdapter::new(Operator::new(gcs)?.finish())))
}
