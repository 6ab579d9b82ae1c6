//! Core types shared across the search modules.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SNIPPET_LEN;
use crate::error::{CapabilityError, ChunkingError};
use crate::storage::StoreError;

/// Unique document identifier.
///
/// Ids are assigned by the corpus and are stable across rebuilds; the core
/// never generates them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Creates a DocumentId from a raw u64 value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A corpus document. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable, unique identifier assigned by the corpus.
    pub id: DocumentId,
    /// Document title.
    pub title: String,
    /// Document body text.
    pub description: String,
}

impl Document {
    /// Creates a document from raw parts.
    pub fn new(id: u64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: DocumentId::from_u64(id),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One entry of a single-ranker result list (keyword or semantic side).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Document identifier.
    pub id: DocumentId,
    /// Document title.
    pub title: String,
    /// Leading slice of the document description.
    pub snippet: String,
    /// Raw ranker score (BM25 sum or max cosine similarity).
    pub score: f32,
}

/// One entry of a fused result list.
///
/// Carries both component scores so callers can explain how the fused
/// ranking came about. Built fresh per query; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Document identifier.
    pub id: DocumentId,
    /// Document title.
    pub title: String,
    /// Leading slice of the document description.
    pub snippet: String,
    /// Keyword-side contribution (normalized BM25 or RRF term).
    pub keyword_score: f32,
    /// Semantic-side contribution (normalized similarity or RRF term).
    pub semantic_score: f32,
    /// Combined score the list is ordered by.
    pub fused_score: f32,
}

/// Truncates a description to the standard snippet length, respecting
/// character boundaries.
pub fn snippet(description: &str) -> String {
    description.chars().take(SNIPPET_LEN).collect()
}

/// Error types for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid search query (empty query, zero limit, multi-token term
    /// where a single token is required, out-of-range alpha).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Document id absent from the index.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),
    /// Vector dimension mismatch (expected vs actual).
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension.
        expected: usize,
        /// Actual embedding dimension received.
        actual: usize,
    },
    /// Invalid chunking configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ChunkingError),
    /// Cache/persistence failure.
    #[error("Cache error: {0}")]
    Cache(#[from] StoreError),
    /// External capability failure (embedding or generation).
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

/// Validates that an embedding has the expected dimension.
///
/// # Errors
///
/// Returns [`SearchError::DimensionMismatch`] when the lengths differ.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), SearchError> {
    if actual == expected {
        Ok(())
    } else {
        Err(SearchError::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_round_trips_raw_value() {
        let id = DocumentId::from_u64(17);
        assert_eq!(id.as_u64(), 17);
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn snippet_truncates_to_limit() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).chars().count(), SNIPPET_LEN);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "é".repeat(200);
        let s = snippet(&text);
        assert_eq!(s.chars().count(), SNIPPET_LEN);
    }

    #[test]
    fn validate_dimension_matches() {
        assert!(validate_dimension(3, 3).is_ok());
        assert!(matches!(
            validate_dimension(3, 2),
            Err(SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
