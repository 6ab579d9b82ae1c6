//! # Lodestone Core
//!
//! Library for hybrid document retrieval: lexical (BM25) matching over an
//! inverted index, semantic matching over chunk embeddings, and rank fusion
//! of the two result lists.
//!
//! The crate owns the scoring algorithms, indexing data structures, chunking
//! strategies, and merge rules. Text embedding and generative-text features
//! (query rewriting, LLM reranking, relevance scoring) are external
//! collaborators reached only through the [`embedding::TextEmbedder`] and
//! [`generation::GenerativeModel`] traits.
//!
//! ## Modules
//!
//! - [`search`] - Hybrid search (BM25 inverted index + chunk vector search + fusion)
//! - [`chunking`] - Overlapping-window text chunking strategies
//! - [`normalize`] - Token normalization (stopwords + Porter stemming)
//! - [`storage`] - Durable index artifacts with consistency checks
//! - [`embedding`] - External text-embedding capability contract
//! - [`generation`] - External generative-text capability contract
//! - [`retry`] - Bounded-retry wrapper for volatile external calls
//! - [`evaluation`] - Retrieval quality metrics (precision/recall/F1)
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types for chunking and external capabilities

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod normalize;
pub mod retry;
pub mod search;
pub mod storage;
pub mod test_utils;
