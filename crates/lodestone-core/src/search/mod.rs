//! Hybrid search: BM25 keyword scoring + chunk vector search + rank fusion.
//!
//! - [`keyword`] - inverted index with TF-IDF and BM25
//! - [`vector`] - chunk embeddings with brute-force cosine search
//! - [`fusion`] - weighted-sum and reciprocal-rank fusion
//! - [`engine`] - the composed [`engine::HybridSearchEngine`]
//! - [`types`] - shared result and error types

pub mod engine;
pub mod fusion;
pub mod keyword;
pub mod types;
pub mod vector;
