//! External generative-text capability contract.
//!
//! Query rewriting, LLM-based reranking, and relevance judging are external
//! collaborators. The core consumes and produces plain data at this
//! boundary and never depends on how the text is generated; the only
//! in-crate implementations are test fakes.

use async_trait::async_trait;

use crate::error::CapabilityError;
use crate::search::types::{Document, DocumentId};

/// Trait for the external generative-text capability.
///
/// All methods may be slow, blocking network calls; callers wrap them in
/// the bounded-retry policy from [`crate::retry`].
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Rewrites a query into an improved form (spelling fixes, expansion,
    /// rephrasing). Returning the input unchanged is valid.
    async fn enhance(&self, query: &str) -> Result<String, CapabilityError>;

    /// Scores a single document's relevance to the query.
    async fn rank(&self, query: &str, document: &Document) -> Result<f32, CapabilityError>;

    /// Orders a batch of documents by relevance to the query, most relevant
    /// first.
    async fn batch_rank(
        &self,
        query: &str,
        documents: &[Document],
    ) -> Result<Vec<DocumentId>, CapabilityError>;

    /// Produces a per-document relevance score for the query.
    async fn evaluate(
        &self,
        query: &str,
        documents: &[Document],
    ) -> Result<Vec<(DocumentId, f32)>, CapabilityError>;
}
