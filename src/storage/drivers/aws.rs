use std::sync::Arc;

use opendal::{services::S3, Operator};

use super::{opendal_adapter::OpendalAdapter, StoreDriver};
use crate::storage::StorageResult;

/// A set of AWS security credentials
#[derive(Debug)]
pub struct Credential {
    /// `AWS_ACCESS_KEY_ID`
    pub key_id: String,
    /// `AWS_SECRET_ACCESS_KEY`
    pub secret_key: String,
    /// `AWS_SESSION_TOKEN`
    pub token: Option<String>,
}

/// Create new AWS s3 storage with bucket and region.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(bucket_name: &str, region: &str) -> StorageResult<Arc<dyn StoreDriver>> {
    let s3 = S3::default().bucket(bucket_name).region(region);
    Ok(Arc::new(OpendalAdapter::new(Operator::new(s3)?.finish())))
}

/// Create new AWS s3 storage with bucket, region and credentials.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn with_credentials(
    bucket_name: &str,
    region: &str,
    credentials: Credential,
) -> StorageResult<Arc<dyn StoreDriver>> {
    let mut s3 = S3::default()
        .bucket(bucket_name)
        .region(region)
        .access_key_id(&credentials.key_id)
        .secret_access_key(&credentials.secret_key);
    if let Some(token) = credentials.token {
        s3 = s3.session_token(&token);
    }
    Ok(Arc::new(OpendalAdapter::new(Operator::new(s3)?.finish())))
}

/// Create new S3-compatible storage (MinIO, OSS, COS and friends) with a
/// custom endpoint.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn with_endpoint(
    bucket_name: &str,
    region: &str,
    endpoint: &str,
    credentials: Credential,
) -> StorageResult<Arc<dyn StoreDriver>> {
    let s3 = S3::default()
        .bucket(bucket_name)
        .region(region)
        .endpoint(endpoint)
        .access_key_id(&credentials.key_id)
        .secret_access_key(&credentials.secret_key);
    Ok(Arc::new(OpendalAdapter::new(Operator::new(s3)?.finish())))
}
