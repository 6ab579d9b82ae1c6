//! Chunk vector store and brute-force semantic search.
//!
//! Every document is split into overlapping chunks, each chunk is embedded
//! once through the external [`TextEmbedder`] capability, and the vectors
//! are held 1:1 with their metadata by position. A query is scored against
//! every chunk vector (a linear scan over the corpus of chunks) and chunk
//! similarities roll up to their owning document by taking the maximum.
//!
//! The embeddings/metadata pair is only ever replaced as a whole: a count
//! mismatch between the two is unrecoverable misalignment and forces a full
//! rebuild of both.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::{validate_dimension, Document, DocumentId, SearchError};
use crate::chunking::ChunkingStrategy;
use crate::embedding::{validate_embed_input, TextEmbedder};
use crate::retry::{retry_with_policy, RetryObserver, RetryPolicy};
use crate::storage::StoreError;

/// Position of a chunk within its owning document.
///
/// Kept in lockstep with the embedding at the same index; regenerated
/// whenever the corpus or the chunking parameters change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Owning document.
    pub doc_id: DocumentId,
    /// Position of the chunk within the document (0-indexed).
    pub chunk_index: usize,
    /// Total number of chunks produced from the document.
    pub chunk_count: usize,
}

/// Serializable state of a [`ChunkVectorStore`].
///
/// The two fields are persisted as separate named artifacts but are only
/// valid together; loading validates the 1:1 pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkArtifacts {
    /// Chunk -> document metadata, by position.
    pub metadata: Vec<ChunkMetadata>,
    /// One embedding per chunk, by position.
    pub embeddings: Vec<Vec<f32>>,
}

/// Cosine similarity between two vectors.
///
/// Defined as 0.0 when either vector has zero norm, rather than being
/// undefined.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Chunk embeddings with document metadata, searched by linear scan.
///
/// # Thread Safety
///
/// Immutable after construction; all query methods take `&self`.
pub struct ChunkVectorStore {
    metadata: Vec<ChunkMetadata>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
}

impl ChunkVectorStore {
    /// Builds the store by chunking and embedding every document.
    ///
    /// Each chunk is embedded exactly once; every embedding call runs under
    /// the bounded-retry policy. Documents with empty text produce no
    /// chunks and simply never appear in semantic results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Capability`] when an embedding call fails
    /// after retries are exhausted, and [`SearchError::DimensionMismatch`]
    /// when the embedder returns a vector of unexpected length. Either way
    /// no partially built store is returned.
    #[instrument(skip_all, fields(documents = corpus.len(), chunker = chunker.name()))]
    pub async fn build(
        corpus: &[Document],
        chunker: &dyn ChunkingStrategy,
        embedder: &dyn TextEmbedder,
        retry: &RetryPolicy,
        observer: &dyn RetryObserver,
    ) -> Result<Self, SearchError> {
        let dimension = embedder.dimension();
        let mut metadata = Vec::new();
        let mut embeddings = Vec::new();

        for doc in corpus {
            let chunks = chunker.chunk(&doc.description);
            for chunk in chunks {
                validate_embed_input(&chunk.text)?;
                let embedding =
                    retry_with_policy(retry, observer, || embedder.embed(&chunk.text)).await?;
                validate_dimension(dimension, embedding.len())?;

                metadata.push(ChunkMetadata {
                    doc_id: doc.id,
                    chunk_index: chunk.index,
                    chunk_count: chunk.count,
                });
                embeddings.push(embedding);
            }
        }

        debug!(
            chunks = metadata.len(),
            dimension, "built chunk vector store"
        );
        Ok(Self {
            metadata,
            embeddings,
            dimension,
        })
    }

    /// Reconstructs a store from persisted artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Inconsistent`] when the embedding count does
    /// not match the metadata count, or when any embedding deviates from
    /// the expected dimension. Callers on the search path recover by
    /// rebuilding both artifacts from the source corpus.
    pub fn from_artifacts(
        artifacts: ChunkArtifacts,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        if artifacts.embeddings.len() != artifacts.metadata.len() {
            return Err(StoreError::Inconsistent(format!(
                "{} chunk embeddings but {} chunk metadata entries",
                artifacts.embeddings.len(),
                artifacts.metadata.len()
            )));
        }
        for (position, embedding) in artifacts.embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(StoreError::Inconsistent(format!(
                    "chunk {position}: embedding dimension {} does not match expected {dimension}",
                    embedding.len()
                )));
            }
        }

        Ok(Self {
            metadata: artifacts.metadata,
            embeddings: artifacts.embeddings,
            dimension,
        })
    }

    /// Returns a serializable copy of the store state.
    pub fn artifacts(&self) -> ChunkArtifacts {
        ChunkArtifacts {
            metadata: self.metadata.clone(),
            embeddings: self.embeddings.clone(),
        }
    }

    /// Returns the number of stored chunks.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns `true` if the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Returns the embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the chunk metadata, in position order.
    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    /// Scores documents against a query embedding.
    ///
    /// Computes cosine similarity between the query and every chunk vector,
    /// reduces chunk scores to one score per document by maximum, sorts
    /// descending (ties by ascending document id), and returns at most
    /// `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DimensionMismatch`] when the query embedding
    /// length does not match the store's dimension.
    #[instrument(skip_all, fields(chunks = self.metadata.len(), limit))]
    pub fn search_scores(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(DocumentId, f32)>, SearchError> {
        validate_dimension(self.dimension, query_embedding.len())?;

        // BTreeMap keeps documents in ascending id order so the stable
        // descending sort below breaks score ties by ascending id.
        let mut best: BTreeMap<DocumentId, f32> = BTreeMap::new();
        for (meta, embedding) in self.metadata.iter().zip(&self.embeddings) {
            let similarity = cosine_similarity(query_embedding, embedding);
            best.entry(meta.doc_id)
                .and_modify(|score| {
                    if similarity > *score {
                        *score = similarity;
                    }
                })
                .or_insert(similarity);
        }

        let mut results: Vec<(DocumentId, f32)> = best.into_iter().collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }
}
