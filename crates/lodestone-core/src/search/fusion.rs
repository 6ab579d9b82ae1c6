//! Rank fusion: merging the semantic and keyword rankings into one list.
//!
//! Two interchangeable strategies over the same merge skeleton:
//!
//! - [`weighted_fusion`] - min-max normalize each side, combine with
//!   `alpha * keyword + (1 - alpha) * semantic`
//! - [`rrf_fusion`] - reciprocal rank fusion, `1/(k + rank)` with 0-based
//!   ranks
//!
//! Tie-break rule: the merged record list is assembled by scanning the
//! semantic list first, then the lexical list; after the stable descending
//! sort, documents with equal fused scores keep that first-encountered
//! order. The rule is carried by an explicit insertion-order vector, never
//! by map iteration order.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{DocumentId, FusedResult, ScoredDocument};

/// Min-max normalizes raw scores to `[0, 1]`.
///
/// Degenerate case: when every value is equal (including single-element
/// lists) every normalized score is defined as 1.0. This inflates
/// low-confidence singleton matches to full confidence; the behavior is
/// deliberate and relied upon by callers.
pub fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    let (min, max) = values.iter().fold((*first, *first), |(min, max), &v| {
        (f32::min(min, v), f32::max(max, v))
    });
    let range = max - min;
    if range == 0.0 {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Reciprocal-rank contribution of the item at 0-based `rank`.
///
/// Note: the canonical RRF formulation uses 1-based ranks; this
/// implementation deliberately starts at 0 (`1/k` for the top item), so
/// absolute scores are not comparable with 1-based implementations.
pub fn rrf_score(rank: usize, k: usize) -> f32 {
    1.0 / ((k + rank) as f32)
}

/// Accumulates the merged record list in first-encountered order.
struct Merger {
    order: Vec<DocumentId>,
    records: HashMap<DocumentId, FusedResult>,
}

impl Merger {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }

    fn add_semantic(&mut self, entry: &ScoredDocument, score: f32) {
        if !self.records.contains_key(&entry.id) {
            self.order.push(entry.id);
            self.records.insert(entry.id, new_record(entry));
        }
        if let Some(record) = self.records.get_mut(&entry.id) {
            record.semantic_score = score;
        }
    }

    fn add_keyword(&mut self, entry: &ScoredDocument, score: f32) {
        if !self.records.contains_key(&entry.id) {
            self.order.push(entry.id);
            self.records.insert(entry.id, new_record(entry));
        }
        if let Some(record) = self.records.get_mut(&entry.id) {
            record.keyword_score = score;
        }
    }

    /// Finalizes into a ranked list: compute the fused score per record,
    /// stable-sort descending (preserving first-encountered order on
    /// ties), truncate.
    fn finish(mut self, fuse: impl Fn(&FusedResult) -> f32, limit: usize) -> Vec<FusedResult> {
        let mut results: Vec<FusedResult> = self
            .order
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect();
        for record in &mut results {
            record.fused_score = fuse(record);
        }
        results.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(limit);
        results
    }
}

fn new_record(entry: &ScoredDocument) -> FusedResult {
    FusedResult {
        id: entry.id,
        title: entry.title.clone(),
        snippet: entry.snippet.clone(),
        keyword_score: 0.0,
        semantic_score: 0.0,
        fused_score: 0.0,
    }
}

/// Weighted-sum fusion of the two rankings.
///
/// Each side's raw scores are min-max normalized independently; a document
/// absent from one side receives 0 for that side's normalized score, the
/// same as a true zero match. `alpha` weights the keyword side:
/// `fused = alpha * keyword + (1 - alpha) * semantic`.
pub fn weighted_fusion(
    semantic: &[ScoredDocument],
    keyword: &[ScoredDocument],
    alpha: f32,
    limit: usize,
) -> Vec<FusedResult> {
    let semantic_norm = min_max_normalize(&collect_scores(semantic));
    let keyword_norm = min_max_normalize(&collect_scores(keyword));

    let mut merger = Merger::new();
    for (entry, score) in semantic.iter().zip(semantic_norm) {
        merger.add_semantic(entry, score);
    }
    for (entry, score) in keyword.iter().zip(keyword_norm) {
        merger.add_keyword(entry, score);
    }

    merger.finish(
        |record| alpha * record.keyword_score + (1.0 - alpha) * record.semantic_score,
        limit,
    )
}

/// Reciprocal rank fusion of the two rankings.
///
/// The contribution of a document at 0-based rank `r` in either list is
/// `1/(k + r)`; absence from a list contributes 0. The fused score is the
/// sum of both contributions.
pub fn rrf_fusion(
    semantic: &[ScoredDocument],
    keyword: &[ScoredDocument],
    k: usize,
    limit: usize,
) -> Vec<FusedResult> {
    let mut merger = Merger::new();
    for (rank, entry) in semantic.iter().enumerate() {
        merger.add_semantic(entry, rrf_score(rank, k));
    }
    for (rank, entry) in keyword.iter().enumerate() {
        merger.add_keyword(entry, rrf_score(rank, k));
    }

    merger.finish(
        |record| record.keyword_score + record.semantic_score,
        limit,
    )
}

fn collect_scores(entries: &[ScoredDocument]) -> Vec<f32> {
    entries.iter().map(|entry| entry.score).collect()
}
