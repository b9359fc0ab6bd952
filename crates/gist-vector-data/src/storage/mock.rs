//! Mock implementation of VectorStorage for testing
//!
//! This module provides a mock storage backend that stores data in memory,
//! useful for unit tests without touching the filesystem.

use crate::{
    VectorDataError, VectorDataResult,
    storage::{
        EmbeddedRecord, StorageSearchResult, StorageStats, StoredRecord, VectorStorage,
        vector_math::cosine_similarity,
    },
};
use async_trait::async_trait;
use gist_common::CorrelationId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type RecordStore = Arc<Mutex<BTreeMap<String, EmbeddedRecord>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock storage backend for testing
#[derive(Clone)]
pub struct MockStorage {
    records: RecordStore,
    collection: Arc<Mutex<Option<usize>>>,
    dimension: usize,
    last_correlation_id: Arc<Mutex<Option<CorrelationId>>>,
    upsert_calls: Arc<AtomicUsize>,
    search_calls: Arc<AtomicUsize>,
    fail_on_store: bool,
    fail_store_after: Option<usize>,
    fail_on_search: bool,
    unavailable: bool,
}

impl MockStorage {
    /// Create a new mock storage instance for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            collection: Arc::new(Mutex::new(None)),
            dimension,
            last_correlation_id: Arc::new(Mutex::new(None)),
            upsert_calls: Arc::new(AtomicUsize::new(0)),
            search_calls: Arc::new(AtomicUsize::new(0)),
            fail_on_store: false,
            fail_store_after: None,
            fail_on_search: false,
            unavailable: false,
        }
    }

    /// Configure to fail on store operations (for testing error handling)
    pub fn with_store_failure(mut self) -> Self {
        self.fail_on_store = true;
        self
    }

    /// Let the first `calls` upserts succeed and fail every one after
    pub fn with_store_failure_after(mut self, calls: usize) -> Self {
        self.fail_store_after = Some(calls);
        self
    }

    /// Configure to fail on search operations (for testing error handling)
    pub fn with_search_failure(mut self) -> Self {
        self.fail_on_search = true;
        self
    }

    /// Behave like a store that cannot be reached at all
    pub fn with_unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Pretend a collection of `dimension` already exists
    pub fn with_existing_collection(self, dimension: usize) -> Self {
        *lock(&self.collection) = Some(dimension);
        self
    }

    /// Stored records ordered by id (for test assertions)
    pub fn get_records(&self) -> Vec<StoredRecord> {
        lock(&self.records)
            .values()
            .map(|embedded| embedded.record.clone())
            .collect()
    }

    /// Get the most recent correlation ID used (for tracing verification)
    pub fn last_correlation_id(&self) -> Option<CorrelationId> {
        lock(&self.last_correlation_id).clone()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> VectorDataResult<()> {
        if self.unavailable {
            return Err(VectorDataError::StorageUnavailable(
                "Mock storage configured as unavailable".into(),
            ));
        }
        Ok(())
    }

    fn require_dimension(&self) -> VectorDataResult<usize> {
        (*lock(&self.collection))
            .ok_or_else(|| VectorDataError::CollectionNotFound("mock".into()))
    }
}

#[async_trait]
impl VectorStorage for MockStorage {
    async fn upsert(
        &self,
        records: &[EmbeddedRecord],
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize> {
        self.check_available()?;
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_correlation_id) = Some(correlation_id.clone());

        if self.fail_on_store || self.fail_store_after.is_some_and(|after| call >= after) {
            return Err(VectorDataError::Storage(
                "Mock storage configured to fail".into(),
            ));
        }

        let dimension = self.require_dimension()?;
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(VectorDataError::VectorDimensionMismatch {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }

        let mut stored = lock(&self.records);
        for embedded in records {
            stored.insert(embedded.record.id.clone(), embedded.clone());
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<StorageSearchResult>> {
        self.check_available()?;
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_correlation_id) = Some(correlation_id.clone());

        if self.fail_on_search {
            return Err(VectorDataError::Storage(
                "Mock search configured to fail".into(),
            ));
        }

        let dimension = self.require_dimension()?;
        if query_embedding.len() != dimension {
            return Err(VectorDataError::VectorDimensionMismatch {
                expected: dimension,
                actual: query_embedding.len(),
            });
        }

        let mut results: Vec<StorageSearchResult> = lock(&self.records)
            .values()
            .map(|embedded| StorageSearchResult {
                record: embedded.record.clone(),
                similarity: cosine_similarity(&query_embedding, &embedded.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn fetch_all_records(&self) -> VectorDataResult<Vec<StoredRecord>> {
        self.check_available()?;
        Ok(self.get_records())
    }

    async fn collection_exists(&self) -> VectorDataResult<bool> {
        self.check_available()?;
        Ok(lock(&self.collection).is_some())
    }

    async fn ensure_collection(&self) -> VectorDataResult<()> {
        self.check_available()?;
        let mut collection = lock(&self.collection);
        match *collection {
            Some(existing) if existing != self.dimension => {
                Err(VectorDataError::VectorDimensionMismatch {
                    expected: existing,
                    actual: self.dimension,
                })
            }
            Some(_) => Ok(()),
            None => {
                *collection = Some(self.dimension);
                Ok(())
            }
        }
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        self.check_available()?;
        lock(&self.records).clear();
        Ok(lock(&self.collection).take().is_some())
    }

    async fn get_stats(&self) -> VectorDataResult<StorageStats> {
        self.check_available()?;
        Ok(StorageStats {
            vector_count: lock(&self.records).len(),
            dimension: self.require_dimension()?,
            storage_bytes: None,
            collection_name: "mock".to_string(),
            storage_type: "mock".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gist_parsing::BlockKind;

    fn embedded(id: &str, embedding: Vec<f32>) -> EmbeddedRecord {
        EmbeddedRecord {
            record: StoredRecord {
                id: id.to_string(),
                content_hash: String::new(),
                language: "rust".to_string(),
                source_path: format!("{id}.rs"),
                start_line: 1,
                end_line: 1,
                kind: BlockKind::Function,
                name: None,
                enclosing_class: None,
                content: String::new(),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_mock_ranks_like_real_storage() {
        let storage = MockStorage::new(2);
        let correlation_id = CorrelationId::new();
        storage.ensure_collection().await.unwrap();
        storage
            .upsert(
                &[
                    embedded("b", vec![1.0, 0.0]),
                    embedded("a", vec![1.0, 0.0]),
                    embedded("c", vec![0.0, 1.0]),
                ],
                &correlation_id,
            )
            .await
            .unwrap();

        let results = storage.search(vec![1.0, 0.0], 2, &correlation_id).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(storage.search_calls(), 1);
        assert_eq!(storage.last_correlation_id(), Some(correlation_id));
    }

    #[tokio::test]
    async fn test_failure_toggles() {
        let correlation_id = CorrelationId::new();

        let unavailable = MockStorage::new(2).with_unavailable();
        assert!(matches!(
            unavailable.collection_exists().await,
            Err(VectorDataError::StorageUnavailable(_))
        ));

        let flaky = MockStorage::new(2).with_store_failure_after(1);
        flaky.ensure_collection().await.unwrap();
        assert!(flaky.upsert(&[embedded("a", vec![1.0, 0.0])], &correlation_id).await.is_ok());
        assert!(flaky.upsert(&[embedded("b", vec![1.0, 0.0])], &correlation_id).await.is_err());
        assert_eq!(flaky.get_records().len(), 1);

        let broken_search = MockStorage::new(2).with_search_failure();
        broken_search.ensure_collection().await.unwrap();
        assert!(broken_search.search(vec![1.0, 0.0], 1, &correlation_id).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_clears_records() {
        let storage = MockStorage::new(2).with_existing_collection(2);
        storage
            .upsert(&[embedded("a", vec![1.0, 0.0])], &CorrelationId::new())
            .await
            .unwrap();

        storage.reset().await.unwrap();
        assert!(storage.collection_exists().await.unwrap());
        assert!(storage.get_records().is_empty());
    }
}
