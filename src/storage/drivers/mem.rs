use std::sync::Arc;

use opendal::{services::Memory, Operator};

use super::{opendal_adapter::OpendalAdapter, StoreDriver};
use crate::storage::StorageResult;

/// Create new in-memory storage.
///
/// # Errors
///
/// Returns an error if the in-memory operator cannot be built
pub fn new() -> StorageResult<Arc<dyn StoreDriver>> {
    Ok(Arc::new(OpendalAdapter::new(
        Operator::new(Memory::default())?.finish(),
    )))
}
