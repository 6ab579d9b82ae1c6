//! Filesystem cache store: one file per artifact under a root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CacheStore, StoreError};

/// Cache store writing each artifact to `<root>/<key>`.
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    /// Opens a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError::Io(format!("failed to create cache directory: {e}")))?;
        Ok(Self { root })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(self.path(key), data)
            .await
            .map_err(|e| StoreError::Io(format!("failed to write {key}: {e}")))
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        tokio::fs::read(self.path(key)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(format!("failed to read {key}: {e}"))
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.path(key).exists())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(format!("failed to delete {key}: {e}"))),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::Io(format!("failed to read cache directory: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(format!("failed to read directory entry: {e}")))?
        {
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let keys = self.list_keys().await?;
        for key in keys {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_round_trips_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsCacheStore::open(dir.path()).expect("open");

        store.save("doc_lengths.bin", b"xyz").await.expect("save");
        assert_eq!(
            store.load("doc_lengths.bin").await.expect("load"),
            b"xyz"
        );
        assert!(store.exists("doc_lengths.bin").await.expect("exists"));
    }

    #[tokio::test]
    async fn fs_store_missing_key_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsCacheStore::open(dir.path()).expect("open");

        assert!(matches!(
            store.load("postings.bin").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists("postings.bin").await.expect("exists"));
    }

    #[tokio::test]
    async fn fs_store_clear_removes_all_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsCacheStore::open(dir.path()).expect("open");

        store.save("a.bin", b"1").await.expect("save");
        store.save("b.bin", b"2").await.expect("save");
        store.clear().await.expect("clear");

        assert!(store.list_keys().await.expect("list").is_empty());
    }
}
