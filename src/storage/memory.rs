//! In-memory object store for tests and dry runs.

use std::sync::Mutex;

use super::{ObjectStore, StorageError, StoredObject};

/// Records every stored object in memory under a `mem://<bucket>/` prefix.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    fail_with: Option<String>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// A store whose uploads always fail with a transport error carrying `message`.
    pub fn failing(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Keys in upload order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Latest bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .iter()
            .rev()
            .find(|(stored, _)| stored == key)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<u8>)>> {
        self.objects.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ObjectStore for MemoryStore {
    fn store(&self, bytes: &[u8], key: &str) -> Result<StoredObject, StorageError> {
        if self.bucket.trim().is_empty() {
            return Err(StorageError::EmptyBucket);
        }
        if let Some(message) = &self.fail_with {
            return Err(StorageError::Transport(message.clone()));
        }
        self.lock().push((key.to_string(), bytes.to_vec()));
        Ok(StoredObject {
            location: format!("mem://{}/{key}", self.bucket),
            key: key.to_string(),
            size: bytes.len() as u64,
        })
    }
}
