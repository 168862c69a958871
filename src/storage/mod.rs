//! Object storage capability used to publish model artifacts.

pub mod gcs;
pub mod memory;

pub use gcs::{GcsStore, TokenSource};
pub use memory::MemoryStore;

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Fully qualified location, e.g. `gs://bucket/key`.
    pub location: String,
    pub key: String,
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Bucket name must not be empty")]
    EmptyBucket,
    #[error("Invalid storage endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Failed to obtain access token: {0}")]
    Auth(String),
    #[error("Access denied (HTTP {code}): {body}")]
    Unauthorized { code: u16, body: String },
    #[error("Bucket {bucket} does not exist (HTTP 404): {body}")]
    BucketNotFound { bucket: String, body: String },
    #[error("Storage server returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),
}

/// Narrow write-only view of an object store.
pub trait ObjectStore {
    /// Store `bytes` under `key`, replacing any existing object.
    fn store(&self, bytes: &[u8], key: &str) -> Result<StoredObject, StorageError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn store(&self, bytes: &[u8], key: &str) -> Result<StoredObject, StorageError> {
        (**self).store(bytes, key)
    }
}
