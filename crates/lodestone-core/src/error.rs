//! Error types for chunking configuration and external capabilities.
//!
//! Search- and storage-specific errors live next to their modules
//! ([`crate::search::types::SearchError`], [`crate::storage::StoreError`]);
//! this module holds the error types shared across component boundaries.

use thiserror::Error;

/// Errors from chunking configuration or execution.
#[derive(Debug, Clone, Error)]
pub enum ChunkingError {
    /// Degenerate chunking parameters (e.g. overlap >= window size).
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
}

/// Errors from the external embedding or generative-text capabilities.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// Input rejected at the call boundary (never retried).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The external call failed; surfaced after the bounded-retry policy
    /// exhausts its attempts.
    #[error("External capability failed: {0}")]
    Failed(String),
}
