//! Inverted index and BM25 keyword scoring.
//!
//! The index is built once per corpus version from normalized tokens of
//! `"{title} {description}"` and is immutable afterwards: postings map each
//! token to the set of documents containing it, term frequencies and
//! document lengths feed the BM25 length normalization.
//!
//! All containers are BTree-based so iteration order, and therefore every
//! tie-break and persisted byte, is deterministic and independent of hash
//! seeding.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::{snippet, Document, DocumentId, ScoredDocument, SearchError};
use crate::config::{BM25_B, BM25_K1};
use crate::normalize::Normalizer;
use crate::storage::StoreError;

/// Serializable state of a [`KeywordIndex`].
///
/// Each field is persisted as its own named artifact so inspection tooling
/// can load them independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordArtifacts {
    /// Token -> set of documents containing it.
    pub postings: BTreeMap<String, BTreeSet<DocumentId>>,
    /// Document id -> document.
    pub documents: BTreeMap<DocumentId, Document>,
    /// Document id -> (token -> occurrence count).
    pub term_frequencies: BTreeMap<DocumentId, BTreeMap<String, u32>>,
    /// Document id -> token count.
    pub doc_lengths: BTreeMap<DocumentId, u32>,
}

/// Inverted index with TF-IDF and BM25 scoring.
///
/// # Thread Safety
///
/// The index is immutable after construction; all query methods take
/// `&self`, so concurrent read-only use needs no locking.
pub struct KeywordIndex {
    normalizer: Normalizer,
    postings: BTreeMap<String, BTreeSet<DocumentId>>,
    documents: BTreeMap<DocumentId, Document>,
    term_frequencies: BTreeMap<DocumentId, BTreeMap<String, u32>>,
    doc_lengths: BTreeMap<DocumentId, u32>,
}

impl KeywordIndex {
    /// Builds the index from a corpus.
    ///
    /// Each document is indexed as the normalized tokens of
    /// `"{title} {description}"`.
    #[instrument(skip_all, fields(documents = corpus.len()))]
    pub fn build(normalizer: Normalizer, corpus: &[Document]) -> Self {
        let mut index = Self {
            normalizer,
            postings: BTreeMap::new(),
            documents: BTreeMap::new(),
            term_frequencies: BTreeMap::new(),
            doc_lengths: BTreeMap::new(),
        };

        for doc in corpus {
            let text = format!("{} {}", doc.title, doc.description);
            index.add_document(doc.clone(), &text);
        }
        debug!(
            documents = index.documents.len(),
            terms = index.postings.len(),
            "built keyword index"
        );
        index
    }

    fn add_document(&mut self, doc: Document, text: &str) {
        let id = doc.id;
        let tokens = self.normalizer.normalize(text);

        let frequencies = self.term_frequencies.entry(id).or_default();
        for token in &tokens {
            *frequencies.entry(token.clone()).or_insert(0) += 1;
        }
        for token in self.normalizer.normalize_unique(text) {
            self.postings.entry(token).or_default().insert(id);
        }
        self.doc_lengths.insert(id, tokens.len() as u32);
        self.documents.insert(id, doc);
    }

    /// Reconstructs an index from persisted artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Inconsistent`] when the artifacts violate the
    /// structural invariants: a posted document id missing from the
    /// document map, or per-document term frequencies not summing to the
    /// recorded document length.
    pub fn from_artifacts(
        normalizer: Normalizer,
        artifacts: KeywordArtifacts,
    ) -> Result<Self, StoreError> {
        for (token, ids) in &artifacts.postings {
            for id in ids {
                if !artifacts.documents.contains_key(id) {
                    return Err(StoreError::Inconsistent(format!(
                        "posting '{token}' references unknown document {id}"
                    )));
                }
            }
        }
        for (id, frequencies) in &artifacts.term_frequencies {
            let total: u32 = frequencies.values().sum();
            let recorded = artifacts.doc_lengths.get(id).copied().unwrap_or(0);
            if total != recorded {
                return Err(StoreError::Inconsistent(format!(
                    "document {id}: term frequencies sum to {total}, doc length is {recorded}"
                )));
            }
        }

        Ok(Self {
            normalizer,
            postings: artifacts.postings,
            documents: artifacts.documents,
            term_frequencies: artifacts.term_frequencies,
            doc_lengths: artifacts.doc_lengths,
        })
    }

    /// Returns a serializable copy of the index state.
    pub fn artifacts(&self) -> KeywordArtifacts {
        KeywordArtifacts {
            postings: self.postings.clone(),
            documents: self.documents.clone(),
            term_frequencies: self.term_frequencies.clone(),
            doc_lengths: self.doc_lengths.clone(),
        }
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no documents have been indexed.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks up a document by id.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Returns the token count of a document.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DocumentNotFound`] for unknown ids.
    pub fn doc_length(&self, id: DocumentId) -> Result<u32, SearchError> {
        self.doc_lengths
            .get(&id)
            .copied()
            .ok_or(SearchError::DocumentNotFound(id))
    }

    /// Average document length in tokens; 0.0 for an empty corpus.
    pub fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: u32 = self.doc_lengths.values().sum();
        total as f32 / self.doc_lengths.len() as f32
    }

    /// Normalizes a term and requires it to produce exactly one token.
    fn single_token(&self, term: &str) -> Result<String, SearchError> {
        let mut tokens = self.normalizer.normalize(term);
        if tokens.len() != 1 {
            return Err(SearchError::InvalidQuery(format!(
                "expected a single-token term, got {} tokens from {term:?}",
                tokens.len()
            )));
        }
        Ok(tokens.remove(0))
    }

    /// Returns the sorted ids of documents containing the term.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] when the term does not
    /// normalize to exactly one token.
    pub fn documents_with_term(&self, term: &str) -> Result<Vec<DocumentId>, SearchError> {
        let token = self.single_token(term)?;
        Ok(self
            .postings
            .get(&token)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Exact occurrence count of `term` in the document.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] for multi-token or empty
    /// terms, [`SearchError::DocumentNotFound`] for unknown ids.
    pub fn term_frequency(&self, doc_id: DocumentId, term: &str) -> Result<u32, SearchError> {
        let token = self.single_token(term)?;
        let frequencies = self
            .term_frequencies
            .get(&doc_id)
            .ok_or(SearchError::DocumentNotFound(doc_id))?;
        Ok(frequencies.get(&token).copied().unwrap_or(0))
    }

    /// Smoothed inverse document frequency: `ln((N+1)/(df+1))`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] when the term does not
    /// normalize to exactly one token.
    pub fn idf(&self, term: &str) -> Result<f32, SearchError> {
        let token = self.single_token(term)?;
        Ok(self.raw_idf(&token))
    }

    /// TF-IDF weight: `term_frequency * idf`.
    ///
    /// # Errors
    ///
    /// Same as [`term_frequency`](Self::term_frequency).
    pub fn tf_idf(&self, doc_id: DocumentId, term: &str) -> Result<f32, SearchError> {
        let token = self.single_token(term)?;
        self.require_document(doc_id)?;
        Ok(self.raw_tf(doc_id, &token) as f32 * self.raw_idf(&token))
    }

    /// BM25 inverse document frequency:
    /// `ln((N - df + 0.5)/(df + 0.5) + 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] when the term does not
    /// normalize to exactly one token.
    pub fn bm25_idf(&self, term: &str) -> Result<f32, SearchError> {
        let token = self.single_token(term)?;
        Ok(self.raw_bm25_idf(&token))
    }

    /// BM25 term-frequency component with saturation and length
    /// normalization:
    /// `tf*(k1+1) / (tf + k1*(1 - b + b*len/avg_len))`.
    ///
    /// Returns 0.0 for an empty corpus (average length 0) instead of
    /// dividing by zero.
    ///
    /// # Errors
    ///
    /// Same as [`term_frequency`](Self::term_frequency).
    pub fn bm25_tf(
        &self,
        doc_id: DocumentId,
        term: &str,
        k1: f32,
        b: f32,
    ) -> Result<f32, SearchError> {
        let token = self.single_token(term)?;
        self.require_document(doc_id)?;
        Ok(self.raw_bm25_tf(doc_id, &token, k1, b))
    }

    /// Full BM25 score of the term in the document, with the shipped
    /// `k1`/`b` defaults.
    ///
    /// # Errors
    ///
    /// Same as [`term_frequency`](Self::term_frequency).
    pub fn bm25(&self, doc_id: DocumentId, term: &str) -> Result<f32, SearchError> {
        let token = self.single_token(term)?;
        self.require_document(doc_id)?;
        Ok(self.raw_bm25(doc_id, &token))
    }

    /// Ranks the whole corpus against a free-text query by summed per-token
    /// BM25.
    ///
    /// Tokens absent from a document contribute 0. Results are sorted by
    /// score descending; ties are broken by ascending document id (the
    /// documents are scanned in id order and the descending sort is
    /// stable). Returns at most `limit` entries.
    #[instrument(skip_all, fields(query_len = query.len(), limit))]
    pub fn bm25_search(&self, query: &str, limit: usize) -> Vec<ScoredDocument> {
        let tokens = self.normalizer.normalize(query);

        let mut results: Vec<ScoredDocument> = self
            .documents
            .values()
            .map(|doc| {
                let score = tokens
                    .iter()
                    .map(|token| self.raw_bm25(doc.id, token))
                    .sum();
                ScoredDocument {
                    id: doc.id,
                    title: doc.title.clone(),
                    snippet: snippet(&doc.description),
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(limit);
        results
    }

    fn require_document(&self, id: DocumentId) -> Result<(), SearchError> {
        if self.documents.contains_key(&id) {
            Ok(())
        } else {
            Err(SearchError::DocumentNotFound(id))
        }
    }

    fn raw_tf(&self, doc_id: DocumentId, token: &str) -> u32 {
        self.term_frequencies
            .get(&doc_id)
            .and_then(|frequencies| frequencies.get(token))
            .copied()
            .unwrap_or(0)
    }

    fn raw_df(&self, token: &str) -> usize {
        self.postings.get(token).map(BTreeSet::len).unwrap_or(0)
    }

    fn raw_idf(&self, token: &str) -> f32 {
        let n = self.documents.len() as f32;
        let df = self.raw_df(token) as f32;
        ((n + 1.0) / (df + 1.0)).ln()
    }

    fn raw_bm25_idf(&self, token: &str) -> f32 {
        let n = self.documents.len() as f32;
        let df = self.raw_df(token) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn raw_bm25_tf(&self, doc_id: DocumentId, token: &str, k1: f32, b: f32) -> f32 {
        let avg_len = self.avg_doc_length();
        if avg_len == 0.0 {
            return 0.0;
        }
        let tf = self.raw_tf(doc_id, token) as f32;
        let doc_len = self.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f32;
        let length_norm = 1.0 - b + b * (doc_len / avg_len);
        tf * (k1 + 1.0) / (tf + k1 * length_norm)
    }

    fn raw_bm25(&self, doc_id: DocumentId, token: &str) -> f32 {
        self.raw_bm25_tf(doc_id, token, BM25_K1, BM25_B) * self.raw_bm25_idf(token)
    }
}
