use std::sync::Arc;

use opendal::{services::Fs, Operator};

use super::{opendal_adapter::OpendalAdapter, StoreDriver};
use crate::storage::StorageResult;

/// Create new filesystem storage with `prefix` applied to all paths
///
/// # Errors
///
/// Returns an error if the path does not exist
pub fn new_with_prefix(prefix: impl AsRef<std::path::Path>) -> StorageResult<Arc<dyn StoreDriver>> {
    let fs = Fs::default().root(&prefix.as_ref().display().to_string());
    Ok(Arc::new(OpendalAdapter::new(Operator::new(fs)?.finish())))
}
