//! Hybrid search engine: keyword + semantic retrieval with rank fusion.
//!
//! [`HybridSearchEngine`] composes the [`KeywordIndex`], the
//! [`ChunkVectorStore`], the external embedding capability, and the
//! [`IndexCache`]. Build is a one-shot batch pass; queries run against
//! immutable indexes and need no locking.
//!
//! Per query, each side is asked for an oversampled candidate pool
//! (`limit * FUSION_OVERSAMPLE`) so fusion merges wide rankings; see
//! [`crate::search::fusion`] for the merge rules.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::fusion::{rrf_fusion, weighted_fusion};
use super::keyword::KeywordIndex;
use super::types::{
    snippet, Document, DocumentId, FusedResult, ScoredDocument, SearchError,
};
use super::vector::ChunkVectorStore;
use crate::chunking::{ChunkingStrategy, SentenceWindowChunker};
use crate::config::FUSION_OVERSAMPLE;
use crate::embedding::{validate_embed_input, TextEmbedder};
use crate::generation::GenerativeModel;
use crate::normalize::Normalizer;
use crate::retry::{retry_with_policy, RetryObserver, RetryPolicy, TracingObserver};
use crate::storage::{CacheManifest, CacheStore, IndexCache};

/// Build-time configuration for the engine.
pub struct EngineOptions {
    /// Token normalizer shared by indexing and querying.
    pub normalizer: Normalizer,
    /// Chunking strategy for the vector store.
    pub chunker: Box<dyn ChunkingStrategy>,
    /// Retry policy for external capability calls.
    pub retry: RetryPolicy,
    /// Observer receiving retry telemetry.
    pub observer: Arc<dyn RetryObserver>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            normalizer: Normalizer::default(),
            chunker: Box::new(SentenceWindowChunker::with_defaults()),
            retry: RetryPolicy::default(),
            observer: Arc::new(TracingObserver),
        }
    }
}

/// Result of an enhanced search: the query that was actually executed plus
/// the fused results.
#[derive(Debug, Clone)]
pub struct EnhancedSearch {
    /// The effective query after enhancement (the original when the
    /// enhanced form was empty or unchanged).
    pub query: String,
    /// Fused results for the effective query.
    pub results: Vec<FusedResult>,
}

/// Hybrid search engine over an immutable corpus snapshot.
///
/// Construct via [`build`](Self::build) or
/// [`load_or_build`](Self::load_or_build); both return the engine only
/// after every artifact is finalized and persisted, so no query can
/// observe a partially built index.
pub struct HybridSearchEngine<S: CacheStore> {
    keyword: KeywordIndex,
    chunks: ChunkVectorStore,
    embedder: Arc<dyn TextEmbedder>,
    cache: IndexCache<S>,
    retry: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl<S: CacheStore> HybridSearchEngine<S> {
    /// Builds both indexes from the corpus and persists them.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Capability`] when embedding fails after
    /// retries, [`SearchError::Cache`] when persisting fails.
    #[instrument(skip_all, fields(documents = corpus.len()))]
    pub async fn build(
        corpus: &[Document],
        embedder: Arc<dyn TextEmbedder>,
        store: S,
        options: EngineOptions,
    ) -> Result<Self, SearchError> {
        let cache = IndexCache::new(store);
        Self::build_with_cache(corpus, embedder, cache, options).await
    }

    async fn build_with_cache(
        corpus: &[Document],
        embedder: Arc<dyn TextEmbedder>,
        cache: IndexCache<S>,
        options: EngineOptions,
    ) -> Result<Self, SearchError> {
        let start = std::time::Instant::now();

        let keyword = KeywordIndex::build(options.normalizer.clone(), corpus);
        let chunks = ChunkVectorStore::build(
            corpus,
            options.chunker.as_ref(),
            embedder.as_ref(),
            &options.retry,
            options.observer.as_ref(),
        )
        .await?;

        let manifest = CacheManifest::new(keyword.len(), chunks.len(), chunks.dimension());
        cache
            .save_all(&keyword.artifacts(), &chunks.artifacts(), &manifest)
            .await?;

        info!(
            documents = keyword.len(),
            chunks = chunks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built and persisted hybrid index"
        );
        Ok(Self {
            keyword,
            chunks,
            embedder,
            cache,
            retry: options.retry,
            observer: options.observer,
        })
    }

    /// Loads the persisted index, falling back to a full rebuild when any
    /// load or consistency check fails.
    ///
    /// This is the preferred constructor for the search path: a missing,
    /// stale, or inconsistent cache is recovered from silently (with a
    /// warning log), never served.
    pub async fn load_or_build(
        corpus: &[Document],
        embedder: Arc<dyn TextEmbedder>,
        store: S,
        options: EngineOptions,
    ) -> Result<Self, SearchError> {
        let cache = IndexCache::new(store);
        match Self::try_load(corpus, &embedder, &cache, &options.normalizer).await {
            Ok((keyword, chunks)) => {
                info!(
                    documents = keyword.len(),
                    chunks = chunks.len(),
                    "loaded hybrid index from cache"
                );
                Ok(Self {
                    keyword,
                    chunks,
                    embedder,
                    cache,
                    retry: options.retry,
                    observer: options.observer,
                })
            }
            Err(error) => {
                warn!(%error, "cache load failed, rebuilding index");
                Self::build_with_cache(corpus, embedder, cache, options).await
            }
        }
    }

    async fn try_load(
        corpus: &[Document],
        embedder: &Arc<dyn TextEmbedder>,
        cache: &IndexCache<S>,
        normalizer: &Normalizer,
    ) -> Result<(KeywordIndex, ChunkVectorStore), crate::storage::StoreError> {
        use crate::storage::StoreError;

        let manifest = cache.load_manifest().await?;
        if manifest.document_count != corpus.len() {
            return Err(StoreError::Inconsistent(format!(
                "cache built from {} documents, corpus has {}",
                manifest.document_count,
                corpus.len()
            )));
        }
        if manifest.embedding_dimension != embedder.dimension() {
            return Err(StoreError::Inconsistent(format!(
                "cache embeddings have dimension {}, embedder produces {}",
                manifest.embedding_dimension,
                embedder.dimension()
            )));
        }

        let keyword =
            KeywordIndex::from_artifacts(normalizer.clone(), cache.load_keyword().await?)?;
        let chunks =
            ChunkVectorStore::from_artifacts(cache.load_chunks().await?, embedder.dimension())?;
        Ok((keyword, chunks))
    }

    /// Returns the keyword index (analytic access: TF/IDF/BM25 lookups).
    pub fn keyword_index(&self) -> &KeywordIndex {
        &self.keyword
    }

    /// Returns the chunk vector store.
    pub fn chunk_store(&self) -> &ChunkVectorStore {
        &self.chunks
    }

    /// Returns the index cache.
    pub fn cache(&self) -> &IndexCache<S> {
        &self.cache
    }

    fn validate_query(query: &str, limit: usize) -> Result<(), SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Err(SearchError::InvalidQuery(
                "limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs both retrievers with an oversampled pool.
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<(Vec<ScoredDocument>, Vec<ScoredDocument>), SearchError> {
        let pool = limit.saturating_mul(FUSION_OVERSAMPLE);

        validate_embed_input(query)?;
        let query_embedding = retry_with_policy(&self.retry, self.observer.as_ref(), || {
            self.embedder.embed(query)
        })
        .await?;

        let semantic_scores = self.chunks.search_scores(&query_embedding, pool)?;
        let semantic = self.hydrate(semantic_scores);
        let keyword = self.keyword.bm25_search(query, pool);
        Ok((semantic, keyword))
    }

    /// Attaches titles and snippets to raw per-document scores.
    fn hydrate(&self, scores: Vec<(DocumentId, f32)>) -> Vec<ScoredDocument> {
        scores
            .into_iter()
            .filter_map(|(id, score)| match self.keyword.document(id) {
                Some(doc) => Some(ScoredDocument {
                    id,
                    title: doc.title.clone(),
                    snippet: snippet(&doc.description),
                    score,
                }),
                None => {
                    warn!(id = id.as_u64(), "scored document missing from map, skipping");
                    None
                }
            })
            .collect()
    }

    /// Weighted-sum hybrid search.
    ///
    /// `alpha` weights the keyword side and must lie in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] for an empty query, a zero
    /// limit, or alpha outside `[0, 1]`; [`SearchError::Capability`] when
    /// query embedding fails after retries.
    #[instrument(skip_all, fields(limit, alpha))]
    pub async fn weighted_search(
        &self,
        query: &str,
        alpha: f32,
        limit: usize,
    ) -> Result<Vec<FusedResult>, SearchError> {
        Self::validate_query(query, limit)?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SearchError::InvalidQuery(format!(
                "alpha must be within [0, 1], got {alpha}"
            )));
        }

        let (semantic, keyword) = self.retrieve(query, limit).await?;
        Ok(weighted_fusion(&semantic, &keyword, alpha, limit))
    }

    /// Reciprocal-rank-fusion hybrid search.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] for an empty query or a zero
    /// limit; [`SearchError::Capability`] when query embedding fails after
    /// retries.
    #[instrument(skip_all, fields(limit, k))]
    pub async fn rrf_search(
        &self,
        query: &str,
        k: usize,
        limit: usize,
    ) -> Result<Vec<FusedResult>, SearchError> {
        Self::validate_query(query, limit)?;

        let (semantic, keyword) = self.retrieve(query, limit).await?;
        Ok(rrf_fusion(&semantic, &keyword, k, limit))
    }

    /// RRF search over a query rewritten by the generative capability.
    ///
    /// The enhancement call runs under the bounded-retry policy. When the
    /// enhanced query comes back empty or identical to the original, the
    /// original query is used unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Capability`] when the enhancement call fails
    /// after retries; otherwise the same errors as
    /// [`rrf_search`](Self::rrf_search).
    #[instrument(skip_all, fields(limit, k))]
    pub async fn enhanced_rrf_search(
        &self,
        model: &dyn GenerativeModel,
        query: &str,
        k: usize,
        limit: usize,
    ) -> Result<EnhancedSearch, SearchError> {
        Self::validate_query(query, limit)?;

        let enhanced = retry_with_policy(&self.retry, self.observer.as_ref(), || {
            model.enhance(query)
        })
        .await?;

        let effective = if enhanced.trim().is_empty() || enhanced == query {
            query.to_string()
        } else {
            info!(original = query, enhanced = enhanced.as_str(), "query enhanced");
            enhanced
        };

        let results = self.rrf_search(&effective, k, limit).await?;
        Ok(EnhancedSearch {
            query: effective,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RRF_K;
    use crate::storage::MemoryCacheStore;
    use crate::test_utils::{paddington_corpus, EchoGenerativeModel, HashingEmbedder};

    fn options() -> EngineOptions {
        EngineOptions {
            retry: RetryPolicy::without_pause(1),
            ..EngineOptions::default()
        }
    }

    async fn engine() -> HybridSearchEngine<MemoryCacheStore> {
        HybridSearchEngine::build(
            &paddington_corpus(),
            Arc::new(HashingEmbedder::new(32)),
            MemoryCacheStore::new(),
            options(),
        )
        .await
        .expect("build succeeds")
    }

    #[tokio::test]
    async fn rrf_search_finds_lexical_and_semantic_matches() {
        let engine = engine().await;
        let results = engine
            .rrf_search("bear london marmalade", RRF_K, 3)
            .await
            .expect("search succeeds");

        assert!(!results.is_empty());
        assert!(results.len() <= 3);
        assert_eq!(results[0].id, DocumentId::from_u64(1));
        assert!(results[0].fused_score > 0.0);
        for pair in results.windows(2) {
            assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[tokio::test]
    async fn weighted_search_respects_limit_and_order() {
        let engine = engine().await;
        let results = engine
            .weighted_search("bear london", 0.5, 2)
            .await
            .expect("search succeeds");

        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let engine = engine().await;
        assert!(matches!(
            engine.rrf_search("   ", RRF_K, 5).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let engine = engine().await;
        assert!(matches!(
            engine.rrf_search("bear", RRF_K, 0).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_alpha_is_rejected() {
        let engine = engine().await;
        assert!(matches!(
            engine.weighted_search("bear", 1.5, 5).await,
            Err(SearchError::InvalidQuery(_))
        ));
        assert!(matches!(
            engine.weighted_search("bear", -0.1, 5).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn each_search_embeds_the_query_exactly_once() {
        let corpus = paddington_corpus();
        let embedder = Arc::new(HashingEmbedder::new(32));

        let engine = HybridSearchEngine::build(
            &corpus,
            embedder.clone(),
            MemoryCacheStore::new(),
            options(),
        )
        .await
        .expect("build succeeds");
        let calls_after_build = embedder.calls();
        assert!(calls_after_build > 0);

        let _ = engine
            .rrf_search("bear", RRF_K, 2)
            .await
            .expect("search succeeds");
        assert_eq!(embedder.calls(), calls_after_build + 1);

        let _ = engine
            .weighted_search("bear", 0.5, 2)
            .await
            .expect("search succeeds");
        assert_eq!(embedder.calls(), calls_after_build + 2);
    }

    #[tokio::test]
    async fn enhanced_search_uses_rewritten_query() {
        let engine = engine().await;
        let model = EchoGenerativeModel::rewriting("bear marmalade london");

        let enhanced = engine
            .enhanced_rrf_search(&model, "beer", RRF_K, 3)
            .await
            .expect("search succeeds");

        assert_eq!(enhanced.query, "bear marmalade london");
        assert!(!enhanced.results.is_empty());
        assert_eq!(enhanced.results[0].id, DocumentId::from_u64(1));
    }

    #[tokio::test]
    async fn enhanced_search_falls_back_to_original_query() {
        let engine = engine().await;
        let model = EchoGenerativeModel::rewriting("   ");

        let enhanced = engine
            .enhanced_rrf_search(&model, "bear london", RRF_K, 3)
            .await
            .expect("search succeeds");
        assert_eq!(enhanced.query, "bear london");
    }
}
