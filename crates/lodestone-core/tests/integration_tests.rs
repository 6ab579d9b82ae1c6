//! End-to-end tests over the public API: build, persist, load, search.

use std::collections::HashSet;
use std::sync::Arc;

use lodestone_core::chunking::SentenceWindowChunker;
use lodestone_core::config::{RRF_K, SCHEMA_VERSION};
use lodestone_core::evaluation::{f1_at_k, precision_at_k, recall_at_k};
use lodestone_core::retry::{RetryPolicy, TracingObserver};
use lodestone_core::search::engine::{EngineOptions, HybridSearchEngine};
use lodestone_core::search::types::{Document, DocumentId};
use lodestone_core::search::vector::ChunkVectorStore;
use lodestone_core::storage::{
    CacheStore, FsCacheStore, CHUNK_EMBEDDINGS_KEY, CHUNK_METADATA_KEY, DOC_LENGTHS_KEY,
    DOCUMENT_MAP_KEY, MANIFEST_KEY, POSTINGS_KEY, TERM_FREQUENCIES_KEY,
};
use lodestone_core::test_utils::{paddington_corpus, FlakyEmbedder, HashingEmbedder};

fn fast_options() -> EngineOptions {
    EngineOptions {
        retry: RetryPolicy::without_pause(1),
        ..EngineOptions::default()
    }
}

#[tokio::test]
async fn build_persists_every_named_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsCacheStore::open(dir.path()).expect("open store");

    let engine = HybridSearchEngine::build(
        &paddington_corpus(),
        Arc::new(HashingEmbedder::new(32)),
        store,
        fast_options(),
    )
    .await
    .expect("build succeeds");

    for key in [
        POSTINGS_KEY,
        DOCUMENT_MAP_KEY,
        TERM_FREQUENCIES_KEY,
        DOC_LENGTHS_KEY,
        CHUNK_METADATA_KEY,
        CHUNK_EMBEDDINGS_KEY,
        MANIFEST_KEY,
    ] {
        assert!(
            engine.cache().store().exists(key).await.expect("exists"),
            "artifact {key} missing after build"
        );
    }
}

#[tokio::test]
async fn persisted_index_is_loaded_without_reembedding() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = paddington_corpus();

    let build_embedder = Arc::new(HashingEmbedder::new(32));
    let engine = HybridSearchEngine::build(
        &corpus,
        build_embedder.clone(),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");
    assert!(build_embedder.calls() > 0);

    let first = engine
        .rrf_search("bear london", RRF_K, 3)
        .await
        .expect("search succeeds");

    // A fresh embedder proves the load path never embeds corpus chunks.
    let load_embedder = Arc::new(HashingEmbedder::new(32));
    let reloaded = HybridSearchEngine::load_or_build(
        &corpus,
        load_embedder.clone(),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("load succeeds");
    assert_eq!(load_embedder.calls(), 0);

    // The reloaded index must reproduce the identical lexical state and
    // the identical search results.
    let original = engine.keyword_index().artifacts();
    let restored = reloaded.keyword_index().artifacts();
    assert_eq!(original.postings, restored.postings);
    assert_eq!(original.term_frequencies, restored.term_frequencies);
    assert_eq!(original.doc_lengths, restored.doc_lengths);

    let second = reloaded
        .rrf_search("bear london", RRF_K, 3)
        .await
        .expect("search succeeds");
    assert_eq!(
        first.iter().map(|r| r.id).collect::<Vec<_>>(),
        second.iter().map(|r| r.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn tampered_cache_forces_a_full_rebuild() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = paddington_corpus();

    HybridSearchEngine::build(
        &corpus,
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    // Remove one side of the chunk artifact pair; the count check must
    // fail and the search path must rebuild rather than serve a
    // misaligned store.
    std::fs::remove_file(dir.path().join(CHUNK_EMBEDDINGS_KEY)).expect("remove artifact");

    let embedder = Arc::new(HashingEmbedder::new(32));
    let engine = HybridSearchEngine::load_or_build(
        &corpus,
        embedder.clone(),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("rebuild succeeds");

    assert!(embedder.calls() > 0, "rebuild must re-embed corpus chunks");
    let results = engine
        .rrf_search("marmalade", RRF_K, 3)
        .await
        .expect("search succeeds");
    assert_eq!(results[0].id, DocumentId::from_u64(1));
}

#[tokio::test]
async fn future_schema_version_forces_a_full_rebuild() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = paddington_corpus();

    HybridSearchEngine::build(
        &corpus,
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    // Rewrite the manifest as if produced by a newer build.
    let manifest_path = dir.path().join(MANIFEST_KEY);
    let raw = std::fs::read_to_string(&manifest_path).expect("read manifest");
    let bumped = raw.replace(
        &format!("\"schema_version\": {SCHEMA_VERSION}"),
        &format!("\"schema_version\": {}", SCHEMA_VERSION + 1),
    );
    assert_ne!(raw, bumped, "manifest rewrite must change the version");
    std::fs::write(&manifest_path, bumped).expect("write manifest");

    let embedder = Arc::new(HashingEmbedder::new(32));
    HybridSearchEngine::load_or_build(
        &corpus,
        embedder.clone(),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("rebuild succeeds");
    assert!(embedder.calls() > 0);
}

#[tokio::test]
async fn corpus_size_change_forces_a_full_rebuild() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut corpus = paddington_corpus();

    HybridSearchEngine::build(
        &corpus,
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    corpus.push(Document::new(
        4,
        "The Third Man",
        "A writer arrives in postwar Vienna. His friend is not what he seemed.",
    ));

    let embedder = Arc::new(HashingEmbedder::new(32));
    let engine = HybridSearchEngine::load_or_build(
        &corpus,
        embedder.clone(),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("rebuild succeeds");

    assert!(embedder.calls() > 0);
    assert_eq!(engine.keyword_index().len(), 4);
}

#[tokio::test]
async fn paddington_scenario_end_to_end() {
    // Single-document corpus: "bear london" must surface the document
    // with a positive BM25 score, and RRF with k=60 must fuse the two
    // rank-0 placements to exactly 1/60 + 1/60 = 1/30.
    let corpus = vec![Document::new(
        1,
        "Paddington",
        "A bear moves to London and causes chaos with marmalade.",
    )];

    let dir = tempfile::tempdir().expect("tempdir");
    let engine = HybridSearchEngine::build(
        &corpus,
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    let keyword = engine.keyword_index().bm25_search("bear london", 5);
    assert_eq!(keyword.len(), 1);
    assert!(keyword[0].score > 0.0);

    let results = engine
        .rrf_search("bear london", 60, 5)
        .await
        .expect("search succeeds");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, DocumentId::from_u64(1));
    assert!((results[0].fused_score - 1.0 / 30.0).abs() < 1e-6);
    assert!((results[0].semantic_score - 1.0 / 60.0).abs() < 1e-6);
    assert!((results[0].keyword_score - 1.0 / 60.0).abs() < 1e-6);
}

#[tokio::test]
async fn weighted_search_inflates_singleton_candidates_to_full_confidence() {
    let corpus = vec![Document::new(
        1,
        "Paddington",
        "A bear moves to London and causes chaos with marmalade.",
    )];

    let dir = tempfile::tempdir().expect("tempdir");
    let engine = HybridSearchEngine::build(
        &corpus,
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    let results = engine
        .weighted_search("marmalade", 0.5, 5)
        .await
        .expect("search succeeds");

    // Both sides hold exactly one candidate, so min-max normalization maps
    // each raw score to 1.0 and the fused score is 1.0 regardless of how
    // weak the raw match was.
    assert_eq!(results.len(), 1);
    assert!((results[0].fused_score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn transient_embedding_failures_are_retried_during_build() {
    let corpus = paddington_corpus();
    let embedder = FlakyEmbedder::new(16, 2);
    let chunker = SentenceWindowChunker::new(2, 1).expect("valid config");

    let store = ChunkVectorStore::build(
        &corpus,
        &chunker,
        &embedder,
        &RetryPolicy::without_pause(3),
        &TracingObserver,
    )
    .await
    .expect("build survives transient failures");

    assert!(!store.is_empty());
    // Two failed attempts plus one success per remaining chunk.
    assert!(embedder.attempts() >= store.len() + 2);
}

#[tokio::test]
async fn exhausted_retries_fail_the_build() {
    let corpus = paddington_corpus();
    // More failures than the policy has attempts.
    let embedder = FlakyEmbedder::new(16, 100);
    let chunker = SentenceWindowChunker::new(2, 1).expect("valid config");

    let result = ChunkVectorStore::build(
        &corpus,
        &chunker,
        &embedder,
        &RetryPolicy::without_pause(3),
        &TracingObserver,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(embedder.attempts(), 3);
}

#[tokio::test]
async fn retrieval_metrics_reflect_search_quality() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = HybridSearchEngine::build(
        &paddington_corpus(),
        Arc::new(HashingEmbedder::new(32)),
        FsCacheStore::open(dir.path()).expect("open store"),
        fast_options(),
    )
    .await
    .expect("build succeeds");

    let results = engine
        .rrf_search("bear in london", RRF_K, 2)
        .await
        .expect("search succeeds");
    let retrieved: Vec<DocumentId> = results.iter().map(|r| r.id).collect();

    let relevant: HashSet<DocumentId> = [DocumentId::from_u64(1)].into_iter().collect();
    let precision = precision_at_k(&retrieved, &relevant, 2);
    let recall = recall_at_k(&retrieved, &relevant, 2);

    // Document 1 matches both query terms and must be retrieved within
    // the top 2, giving full recall.
    assert!((recall - 1.0).abs() < 1e-9);
    assert!((precision - 0.5).abs() < 1e-9);
    assert!(f1_at_k(&retrieved, &relevant, 2) > 0.0);
}
