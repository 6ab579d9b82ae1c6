//! Retrieval quality metrics.
//!
//! Standard set-based IR metrics over ranked document ids against a set of
//! known-relevant documents. All metrics define zero denominators as 0.0
//! rather than NaN so aggregation over many queries stays straightforward.

use std::collections::HashSet;

use crate::search::types::DocumentId;

fn relevant_retrieved(results: &[DocumentId], relevant: &HashSet<DocumentId>, k: usize) -> usize {
    results
        .iter()
        .take(k)
        .filter(|id| relevant.contains(*id))
        .count()
}

/// Precision@k: fraction of the first `k` ranks holding a relevant
/// document.
///
/// The denominator is `k` itself, not the number of returned results;
/// returning fewer than `k` results costs precision.
pub fn precision_at_k(results: &[DocumentId], relevant: &HashSet<DocumentId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    relevant_retrieved(results, relevant, k) as f64 / k as f64
}

/// Recall@k: fraction of the relevant set found in the first `k` ranks.
pub fn recall_at_k(results: &[DocumentId], relevant: &HashSet<DocumentId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    relevant_retrieved(results, relevant, k) as f64 / relevant.len() as f64
}

/// F1@k: harmonic mean of precision@k and recall@k.
pub fn f1_at_k(results: &[DocumentId], relevant: &HashSet<DocumentId>, k: usize) -> f64 {
    let precision = precision_at_k(results, relevant, k);
    let recall = recall_at_k(results, relevant, k);
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}
