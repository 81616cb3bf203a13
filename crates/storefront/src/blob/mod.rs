//! Blob storage.
//!
//! Objects addressed by slash-separated pathnames (`admin/password.json`).
//! The admin area keeps its password record here; the cart never touches it.

mod local;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use local::LocalBlobStore;

/// Errors raised by a [`BlobStore`].
#[derive(Debug, Error)]
pub enum BlobError {
    /// The key is empty, absolute, or has empty, `.` or `..` segments.
    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),

    /// A blob exists at the key and overwriting was not allowed.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// No blob exists at the key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Reading or writing the backing medium failed.
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking the store failed.
    #[error("blob listing failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// A blocking storage task did not complete.
    #[error("blob task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Options for [`BlobStore::put`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Insert a random suffix before the extension so the key never collides.
    pub add_random_suffix: bool,
    /// Replace an existing blob at the same key.
    pub allow_overwrite: bool,
}

/// Metadata of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRecord {
    /// Key the blob is stored under (after any random suffix).
    pub pathname: String,
    /// Location the content can be retrieved from.
    pub url: String,
    /// Content length in bytes.
    pub size: u64,
    /// Time of the last write.
    pub uploaded_at: DateTime<Utc>,
}

/// An object store.
pub trait BlobStore: Send + Sync + 'static {
    /// Store `content` under `key`.
    fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        options: PutOptions,
    ) -> impl Future<Output = Result<BlobRecord, BlobError>> + Send;

    /// List blobs whose pathname starts with `prefix`, sorted by pathname.
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<BlobRecord>, BlobError>> + Send;

    /// Retrieve the content of a listed blob.
    fn read(&self, record: &BlobRecord) -> impl Future<Output = Result<Vec<u8>, BlobError>> + Send;
}
