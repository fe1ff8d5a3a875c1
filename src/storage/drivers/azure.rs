use std::sync::Arc;

use opendal::{services::Azblob, Operator};

use super::{opendal_adapter::OpendalAdapter, StoreDriver};
use crate::storage::StorageResult;

/// Create new Azure Blob storage.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(
    container_name: &str,
    account_name: &str,
    account_key: &str,
) -> StorageResult<Arc<dyn StoreDriver>> {
    let azure = Azblob::default()
        .container(container_name)
        .account_name(account_name)
        .account_key(account_key);
    Ok(Arc::new(OpendalAdapter::new(
        Operator::new(azure)?.finish(),
    )))
}
