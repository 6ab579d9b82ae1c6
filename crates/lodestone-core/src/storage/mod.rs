//! Durable storage for index artifacts.
//!
//! Two layers:
//!
//! - [`CacheStore`] - a byte-blob store keyed by artifact name, with
//!   filesystem ([`FsCacheStore`]) and in-memory ([`MemoryCacheStore`])
//!   implementations.
//! - [`IndexCache`] - the typed layer on top: serializes the named index
//!   artifacts, maintains a versioned manifest, and runs the structural
//!   consistency checks on load.
//!
//! There is no incremental update path: any corpus change rebuilds and
//! rewrites every artifact.

mod fs_store;
mod index_cache;

pub use fs_store::FsCacheStore;
pub use index_cache::{
    CacheManifest, IndexCache, CHUNK_EMBEDDINGS_KEY, CHUNK_METADATA_KEY, DOCUMENT_MAP_KEY,
    DOC_LENGTHS_KEY, MANIFEST_KEY, POSTINGS_KEY, TERM_FREQUENCIES_KEY,
};

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Storage error types.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Artifact not present in the store.
    #[error("Not found: {0}")]
    NotFound(String),
    /// I/O failure reading or writing an artifact.
    #[error("I/O error: {0}")]
    Io(String),
    /// Artifact bytes could not be encoded/decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Artifacts disagree with each other (count mismatch, dangling
    /// references). Search-path callers recover with a full rebuild.
    #[error("Cache inconsistent: {0}")]
    Inconsistent(String),
    /// Persisted schema version is not readable by this build.
    #[error("Incompatible schema version: found {found}, supported {supported}")]
    IncompatibleSchema {
        /// Version recorded in the manifest.
        found: u32,
        /// Version this build reads and writes.
        supported: u32,
    },
}

/// Byte-blob storage backend keyed by artifact name.
///
/// Implementations persist small named artifacts; the typed layer above
/// decides what the bytes mean.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Saves binary data under a key, replacing any previous value.
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Loads binary data by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the key has never been saved.
    async fn load(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Checks whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes data by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Lists all stored keys.
    async fn list_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Removes all stored data.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory store backed by a `HashMap`.
///
/// Fully functional; used by tests and as scratch storage when durability
/// is not needed.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned lock means a writer panicked mid-operation; the map
        // itself is still structurally valid bytes, so keep serving it.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}
