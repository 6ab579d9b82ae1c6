//! Shared test fakes and fixtures.
//!
//! Deterministic stand-ins for the external capabilities so unit and
//! integration tests exercise the full build/search flow without network
//! access. Not intended for production use.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::{validate_embed_input, TextEmbedder};
use crate::error::CapabilityError;
use crate::generation::GenerativeModel;
use crate::search::types::{Document, DocumentId};

/// Deterministic bag-of-words embedder.
///
/// Each lowercased, punctuation-trimmed word hashes to one of `dimension`
/// buckets; the embedding counts bucket hits. Texts sharing words get high
/// cosine similarity, which is all the retrieval tests need.
pub struct HashingEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of successful embed calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, word: &str) -> usize {
        let hash = word
            .bytes()
            .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
        (hash % self.dimension as u64) as usize
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        validate_embed_input(text)?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut embedding = vec![0.0; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if word.is_empty() {
                continue;
            }
            embedding[self.bucket(word)] += 1.0;
        }
        Ok(embedding)
    }
}

/// Embedder that fails a fixed number of times before succeeding.
///
/// Exercises the bounded-retry policy around embedding calls.
pub struct FlakyEmbedder {
    inner: HashingEmbedder,
    remaining_failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyEmbedder {
    /// Creates an embedder whose first `failures` calls fail.
    pub fn new(dimension: usize, failures: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dimension),
            remaining_failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Total number of embed attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEmbedder for FlakyEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CapabilityError::Failed(
                "simulated transient failure".to_string(),
            ));
        }
        self.inner.embed(text).await
    }
}

/// Generative model fake with a fixed enhancement rewrite.
pub struct EchoGenerativeModel {
    rewrite: Option<String>,
}

impl EchoGenerativeModel {
    /// Model whose `enhance` returns the query unchanged.
    pub fn new() -> Self {
        Self { rewrite: None }
    }

    /// Model whose `enhance` always returns the given rewrite.
    pub fn rewriting(rewrite: impl Into<String>) -> Self {
        Self {
            rewrite: Some(rewrite.into()),
        }
    }
}

impl Default for EchoGenerativeModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeModel for EchoGenerativeModel {
    async fn enhance(&self, query: &str) -> Result<String, CapabilityError> {
        Ok(self
            .rewrite
            .clone()
            .unwrap_or_else(|| query.to_string()))
    }

    async fn rank(&self, _query: &str, _document: &Document) -> Result<f32, CapabilityError> {
        Ok(0.5)
    }

    async fn batch_rank(
        &self,
        _query: &str,
        documents: &[Document],
    ) -> Result<Vec<DocumentId>, CapabilityError> {
        Ok(documents.iter().map(|doc| doc.id).collect())
    }

    async fn evaluate(
        &self,
        _query: &str,
        documents: &[Document],
    ) -> Result<Vec<(DocumentId, f32)>, CapabilityError> {
        Ok(documents.iter().map(|doc| (doc.id, 1.0)).collect())
    }
}

/// Small fixed corpus used across engine tests.
pub fn paddington_corpus() -> Vec<Document> {
    vec![
        Document::new(
            1,
            "Paddington",
            "A bear moves to London and causes chaos with marmalade. \
             He is taken in by the Brown family. The bear learns to live in the city.",
        ),
        Document::new(
            2,
            "The Jungle Book",
            "A boy raised by wolves meets a bear in the jungle. \
             Together they face a fearsome tiger. The jungle is full of dangers.",
        ),
        Document::new(
            3,
            "Notting Hill",
            "A bookshop owner in London falls in love with a famous actress. \
             Their worlds could not be further apart. Fame complicates everything.",
        ),
    ]
}
