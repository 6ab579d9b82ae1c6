//! Production configuration constants.
//!
//! Central place for the tunable values used across indexing, search, and
//! persistence. Benchmarks and tests reference these to stay consistent
//! with the shipped defaults.

/// BM25 term-frequency saturation parameter (`k1`).
///
/// Controls how quickly repeated occurrences of a term stop adding score.
/// 1.2-2.0 is the usual range; 1.5 is the shipped default.
pub const BM25_K1: f32 = 1.5;

/// BM25 document-length normalization parameter (`b`).
///
/// 0 disables length normalization entirely, 1 normalizes fully by
/// `len(doc) / avg_len`. 0.75 is the standard default.
pub const BM25_B: f32 = 0.75;

/// Standard RRF `k` parameter value from the original RRF paper
/// (Cormack, Clarke, and Buettcher, SIGIR 2009).
///
/// - Smaller k -> more emphasis on top-ranked results
/// - Larger k -> more uniform weighting across ranks
pub const RRF_K: usize = 60;

/// Default weighting between keyword and semantic scores in weighted
/// fusion: `alpha * keyword + (1 - alpha) * semantic`.
pub const DEFAULT_ALPHA: f32 = 0.5;

/// Default number of sentences per window for sentence-window chunking.
pub const DEFAULT_CHUNK_SENTENCES: usize = 4;

/// Default number of sentences shared between consecutive windows.
pub const DEFAULT_SENTENCE_OVERLAP: usize = 1;

/// Candidate-pool multiplier for fusion.
///
/// Each side of a hybrid search (keyword, semantic) is asked for
/// `limit * FUSION_OVERSAMPLE` candidates so fusion merges wide rankings
/// rather than two already-truncated top-k lists.
pub const FUSION_OVERSAMPLE: usize = 500;

/// Number of characters of a document description carried in result
/// snippets.
pub const SNIPPET_LEN: usize = 100;

/// Default number of attempts for calls to volatile external capabilities.
pub const RETRY_ATTEMPTS: usize = 3;

/// Default fixed pause between retry attempts, in milliseconds.
pub const RETRY_PAUSE_MS: u64 = 1000;

/// Current schema version of the persisted index artifacts.
///
/// Increment on any breaking change to the artifact layout so stale caches
/// fail the manifest check instead of silently passing consistency checks.
pub const SCHEMA_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_parameters_in_standard_ranges() {
        assert!(BM25_K1 >= 1.2 && BM25_K1 <= 2.0);
        assert!(BM25_B >= 0.0 && BM25_B <= 1.0);
    }

    #[test]
    fn sentence_window_defaults_have_positive_stride() {
        assert!(DEFAULT_CHUNK_SENTENCES > DEFAULT_SENTENCE_OVERLAP);
    }

    #[test]
    fn oversample_widens_the_pool() {
        assert!(FUSION_OVERSAMPLE > 1);
    }
}
