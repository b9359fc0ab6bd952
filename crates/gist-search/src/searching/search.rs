//! Search service implementation

use super::service::SearchService;
use crate::error::{SearchError, SearchResult};
use async_trait::async_trait;
use gist_common::CorrelationId;
use gist_config::SearchConfig;
use gist_embeddings::EmbeddingService;
use gist_vector_data::{StoredRecord, VectorDataError, VectorStorage};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

/// A ranked search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: StoredRecord,
    /// Cosine similarity, higher is closer
    pub similarity: f32,
    /// 1-based position in the result list
    pub rank: usize,
}

impl SearchHit {
    /// `1 - similarity`, lower is closer
    pub fn distance(&self) -> f32 {
        1.0 - self.similarity
    }
}

/// Semantic search over one indexed root
pub struct Search {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_storage: Arc<dyn VectorStorage>,
    root: PathBuf,
    search_timeout: Duration,
}

impl Search {
    /// Create a search service with full dependency injection
    ///
    /// `vector_storage` must be scoped to `root`'s collection; `root` only
    /// appears in error messages.
    pub fn new(
        embedding_service: Arc<dyn EmbeddingService>,
        vector_storage: Arc<dyn VectorStorage>,
        root: impl Into<PathBuf>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            embedding_service,
            vector_storage,
            root: root.into(),
            search_timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    fn index_not_found(&self) -> SearchError {
        SearchError::IndexNotFound {
            root: self.root.display().to_string(),
        }
    }

    async fn try_search(
        &self,
        query: &str,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Vec<SearchHit>> {
        tracing::debug!("Generating embedding for search query");
        let query_embedding = self
            .embedding_service
            .embed_query(query)
            .await
            .map_err(|e| match SearchError::from(e) {
                SearchError::EmbeddingError(_) => SearchError::EmbeddingFailed {
                    query: query.to_string(),
                    correlation_id: correlation_id.clone(),
                },
                mismatch => mismatch,
            })?;

        tracing::debug!("Performing vector search");
        let mut matches = self
            .vector_storage
            .search(query_embedding, limit, correlation_id)
            .await
            .map_err(|e| match e {
                // Collection vanished between the existence check and the lookup
                VectorDataError::CollectionNotFound(_) => self.index_not_found(),
                other => other.into(),
            })?;

        // Stable regardless of backend ordering
        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        matches.truncate(limit);

        Ok(matches
            .into_iter()
            .zip(1..)
            .map(|(m, rank)| SearchHit {
                record: m.record,
                similarity: m.similarity,
                rank,
            })
            .collect())
    }
}

#[async_trait]
impl SearchService for Search {
    #[tracing::instrument(skip_all, fields(query = %query, limit = limit, correlation_id = %correlation_id))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Vec<SearchHit>> {
        if limit == 0 {
            return Err(SearchError::InvalidLimit);
        }

        // Before any embedding work
        if !self.index_exists().await? {
            return Err(self.index_not_found());
        }

        let results = tokio::time::timeout(
            self.search_timeout,
            self.try_search(query, limit, correlation_id),
        )
        .await
        .map_err(|_| {
            tracing::error!(
                "Search operation timed out after {:?} for query '{query}' (correlation_id: {correlation_id})",
                self.search_timeout
            );
            SearchError::SearchTimeout {
                query: query.to_string(),
                timeout_ms: u64::try_from(self.search_timeout.as_millis()).unwrap_or(u64::MAX),
                correlation_id: correlation_id.clone(),
            }
        })??;

        tracing::info!("Search returned {} results", results.len());
        Ok(results)
    }

    async fn index_exists(&self) -> SearchResult<bool> {
        Ok(self.vector_storage.collection_exists().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gist_embeddings::{
        DefaultEmbeddingService, EmbeddingProvider, EmbeddingResult, HashingEmbeddingProvider,
    };
    use gist_parsing::BlockKind;
    use gist_vector_data::{EmbeddedRecord, MockStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIM: usize = 256;

    /// Hashing provider that counts calls and can stall
    struct CountingProvider {
        inner: HashingEmbeddingProvider,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.embed_batch(texts).await
        }

        fn embedding_dimension(&self) -> usize {
            self.inner.embedding_dimension()
        }

        fn max_tokens(&self) -> usize {
            self.inner.max_tokens()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }

        async fn is_ready(&self) -> bool {
            true
        }

        async fn ensure_ready(&self) -> EmbeddingResult<()> {
            Ok(())
        }
    }

    fn embedding(
        dimension: usize,
        delay: Option<Duration>,
    ) -> (Arc<dyn EmbeddingService>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            inner: HashingEmbeddingProvider::new(dimension),
            calls: Arc::clone(&calls),
            delay,
        };
        (
            Arc::new(DefaultEmbeddingService::with_provider(Arc::new(provider), 1)),
            calls,
        )
    }

    fn record(id: &str, content: &str) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            content_hash: String::new(),
            language: "python".to_string(),
            source_path: format!("{id}.py"),
            start_line: 1,
            end_line: 2,
            kind: BlockKind::Function,
            name: None,
            enclosing_class: None,
            content: content.to_string(),
        }
    }

    async fn seeded_storage(records: &[(&str, &str)]) -> MockStorage {
        let storage = MockStorage::new(DIM);
        storage.ensure_collection().await.unwrap();
        let hashing = HashingEmbeddingProvider::new(DIM);
        let embedded: Vec<_> = records
            .iter()
            .map(|(id, content)| EmbeddedRecord {
                record: record(id, content),
                embedding: hashing.embed_text(content),
            })
            .collect();
        storage.upsert(&embedded, &CorrelationId::new()).await.unwrap();
        storage
    }

    fn search(storage: &MockStorage, embedding: Arc<dyn EmbeddingService>) -> Search {
        Search::new(
            embedding,
            Arc::new(storage.clone()),
            "/tmp/project",
            &SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_index_fails_before_embedding() {
        let storage = MockStorage::new(DIM);
        let (embedding, calls) = embedding(DIM, None);

        let err = search(&storage, embedding)
            .search("anything", 3, &CorrelationId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::IndexNotFound { ref root } if root == "/tmp/project"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(storage.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_limit_is_rejected() {
        let storage = seeded_storage(&[("a", "def a(): pass")]).await;
        let (embedding, _) = embedding(DIM, None);

        let err = search(&storage, embedding)
            .search("a", 0, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidLimit));
    }

    #[tokio::test]
    async fn test_hits_are_ranked_and_limited() {
        let storage = seeded_storage(&[
            ("parse", "def parse_config(path): return toml.load(path)"),
            ("render", "def render_page(template): return template.render()"),
            ("load", "def load_config(path): return parse_config(path)"),
        ])
        .await;
        let (embedding, _) = embedding(DIM, None);

        let hits = search(&storage, embedding)
            .search("parse config", 2, &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!((hits[0].distance() - (1.0 - hits[0].similarity)).abs() < f32::EPSILON);
        assert!(hits.iter().all(|h| h.record.id != "render"));
    }

    #[tokio::test]
    async fn test_equal_scores_break_ties_by_id() {
        let storage =
            seeded_storage(&[("zeta", "fn same()"), ("alpha", "fn same()"), ("mid", "fn same()")])
                .await;
        let (embedding, _) = embedding(DIM, None);

        let hits = search(&storage, embedding)
            .search("same", 3, &CorrelationId::new())
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_explicit() {
        let storage = seeded_storage(&[("a", "def a(): pass")]).await;
        let (embedding, _) = embedding(DIM * 2, None);

        let err = search(&storage, embedding)
            .search("a", 1, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch { expected: DIM, actual: 512 }
        ));
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let storage = seeded_storage(&[("a", "def a(): pass")]).await;
        let (embedding, _) = embedding(DIM, Some(Duration::from_millis(500)));

        let err = search(&storage, embedding)
            .with_timeout(Duration::from_millis(20))
            .search("a", 1, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::SearchTimeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let storage = MockStorage::new(DIM).with_search_failure().with_existing_collection(DIM);
        let (embedding, _) = embedding(DIM, None);
        let correlation_id = CorrelationId::new();

        let err = search(&storage, embedding)
            .search("a", 1, &correlation_id)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::VectorDataError(_)));
        assert_eq!(storage.last_correlation_id(), Some(correlation_id));
    }
}
