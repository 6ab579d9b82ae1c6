//! Typed artifact layer over a [`CacheStore`].
//!
//! The index persists as six named artifacts plus a manifest:
//!
//! | key | contents |
//! |---|---|
//! | `postings.bin` | token -> document-id set |
//! | `document_map.bin` | document id -> document |
//! | `term_frequencies.bin` | document id -> token counts |
//! | `doc_lengths.bin` | document id -> token count |
//! | `chunk_metadata.bin` | chunk -> document metadata |
//! | `chunk_embeddings.bin` | one vector per chunk |
//! | `manifest.json` | schema version + corpus statistics |
//!
//! Binary artifacts are bincode; the manifest is JSON so it stays readable
//! during debugging. The manifest is written last on save and checked
//! first on load, so a half-written cache fails the load checks instead of
//! serving a partially built index.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CacheStore, StoreError};
use crate::config::SCHEMA_VERSION;
use crate::search::keyword::KeywordArtifacts;
use crate::search::vector::ChunkArtifacts;

/// Artifact key: postings.
pub const POSTINGS_KEY: &str = "postings.bin";
/// Artifact key: document map.
pub const DOCUMENT_MAP_KEY: &str = "document_map.bin";
/// Artifact key: term frequencies.
pub const TERM_FREQUENCIES_KEY: &str = "term_frequencies.bin";
/// Artifact key: document lengths.
pub const DOC_LENGTHS_KEY: &str = "doc_lengths.bin";
/// Artifact key: chunk metadata.
pub const CHUNK_METADATA_KEY: &str = "chunk_metadata.bin";
/// Artifact key: chunk embeddings.
pub const CHUNK_EMBEDDINGS_KEY: &str = "chunk_embeddings.bin";
/// Artifact key: manifest.
pub const MANIFEST_KEY: &str = "manifest.json";

/// Versioned description of a persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Schema version the artifacts were written with.
    pub schema_version: u32,
    /// Number of documents in the indexed corpus.
    pub document_count: usize,
    /// Number of chunks in the vector store.
    pub chunk_count: usize,
    /// Embedding dimension of the chunk vectors.
    pub embedding_dimension: usize,
}

impl CacheManifest {
    /// Creates a manifest for a freshly built index.
    pub fn new(document_count: usize, chunk_count: usize, embedding_dimension: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            document_count,
            chunk_count,
            embedding_dimension,
        }
    }

    /// Whether this build can read artifacts written with the manifest's
    /// schema version.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

/// Typed save/load of the named index artifacts.
pub struct IndexCache<S> {
    store: S,
}

impl<S: CacheStore> IndexCache<S> {
    /// Wraps a blob store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying blob store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn save_bincode<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value)
            .map_err(|e| StoreError::Serialization(format!("failed to encode {key}: {e}")))?;
        self.store.save(key, &bytes).await
    }

    async fn load_bincode<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let bytes = self.store.load(key).await?;
        bincode::deserialize(&bytes)
            .map_err(|e| StoreError::Serialization(format!("failed to decode {key}: {e}")))
    }

    /// Loads and validates the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no manifest exists and
    /// [`StoreError::IncompatibleSchema`] when the recorded schema version
    /// is not readable by this build.
    pub async fn load_manifest(&self) -> Result<CacheManifest, StoreError> {
        let bytes = self.store.load(MANIFEST_KEY).await?;
        let manifest: CacheManifest = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("failed to decode manifest: {e}")))?;
        if !manifest.is_compatible() {
            return Err(StoreError::IncompatibleSchema {
                found: manifest.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(manifest)
    }

    async fn save_manifest(&self, manifest: &CacheManifest) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StoreError::Serialization(format!("failed to encode manifest: {e}")))?;
        self.store.save(MANIFEST_KEY, &bytes).await
    }

    /// Loads the keyword-index artifacts.
    pub async fn load_keyword(&self) -> Result<KeywordArtifacts, StoreError> {
        Ok(KeywordArtifacts {
            postings: self.load_bincode(POSTINGS_KEY).await?,
            documents: self.load_bincode(DOCUMENT_MAP_KEY).await?,
            term_frequencies: self.load_bincode(TERM_FREQUENCIES_KEY).await?,
            doc_lengths: self.load_bincode(DOC_LENGTHS_KEY).await?,
        })
    }

    /// Loads the chunk artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Inconsistent`] when the embedding count does
    /// not match the metadata count. The pair is only valid together;
    /// partial repair is not supported.
    pub async fn load_chunks(&self) -> Result<ChunkArtifacts, StoreError> {
        let artifacts = ChunkArtifacts {
            metadata: self.load_bincode(CHUNK_METADATA_KEY).await?,
            embeddings: self.load_bincode(CHUNK_EMBEDDINGS_KEY).await?,
        };
        if artifacts.embeddings.len() != artifacts.metadata.len() {
            return Err(StoreError::Inconsistent(format!(
                "{} chunk embeddings but {} chunk metadata entries",
                artifacts.embeddings.len(),
                artifacts.metadata.len()
            )));
        }
        Ok(artifacts)
    }

    /// Persists a complete index: all six artifacts, then the manifest.
    ///
    /// The previous manifest is removed first and the new one written only
    /// after every artifact landed, so readers either see a complete,
    /// consistent cache or fail the manifest check and rebuild.
    #[instrument(skip_all, fields(
        documents = manifest.document_count,
        chunks = manifest.chunk_count
    ))]
    pub async fn save_all(
        &self,
        keyword: &KeywordArtifacts,
        chunks: &ChunkArtifacts,
        manifest: &CacheManifest,
    ) -> Result<(), StoreError> {
        self.store.delete(MANIFEST_KEY).await?;

        self.save_bincode(POSTINGS_KEY, &keyword.postings).await?;
        self.save_bincode(DOCUMENT_MAP_KEY, &keyword.documents)
            .await?;
        self.save_bincode(TERM_FREQUENCIES_KEY, &keyword.term_frequencies)
            .await?;
        self.save_bincode(DOC_LENGTHS_KEY, &keyword.doc_lengths)
            .await?;
        self.save_bincode(CHUNK_METADATA_KEY, &chunks.metadata)
            .await?;
        self.save_bincode(CHUNK_EMBEDDINGS_KEY, &chunks.embeddings)
            .await?;

        self.save_manifest(manifest).await?;
        debug!("persisted index artifacts");
        Ok(())
    }

    /// Removes every artifact.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}
