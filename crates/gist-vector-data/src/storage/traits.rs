//! Storage abstraction traits for vector databases
//!
//! A storage instance is scoped to one named collection. Implementations must
//! treat `upsert` as insert-or-replace keyed by record id, and must return
//! search results ordered by decreasing similarity with ties broken by id.

use crate::storage::record::{EmbeddedRecord, StoredRecord};
use crate::VectorDataResult;
use async_trait::async_trait;
use gist_common::CorrelationId;

/// Search result with similarity score from storage
#[derive(Debug, Clone)]
pub struct StorageSearchResult {
    pub record: StoredRecord,
    /// Cosine similarity, higher is closer
    pub similarity: f32,
}

/// Trait for vector storage backends
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Insert or replace records by id
    ///
    /// Every embedding must match the collection's dimension. Returns the
    /// number of records written.
    async fn upsert(
        &self,
        records: &[EmbeddedRecord],
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize>;

    /// Top-`limit` records nearest to `query_embedding`
    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<StorageSearchResult>>;

    /// Every stored record, ordered by id
    async fn fetch_all_records(&self) -> VectorDataResult<Vec<StoredRecord>>;

    /// Check if the storage collection exists
    ///
    /// Must not create anything as a side effect.
    async fn collection_exists(&self) -> VectorDataResult<bool>;

    /// Create the storage collection if it doesn't exist
    async fn ensure_collection(&self) -> VectorDataResult<()>;

    /// Drop the entire collection
    ///
    /// WARNING: This deletes all data in the collection
    async fn drop_collection(&self) -> VectorDataResult<bool>;

    /// Destroy and recreate an empty collection
    async fn reset(&self) -> VectorDataResult<()> {
        self.drop_collection().await?;
        self.ensure_collection().await
    }

    /// Get storage statistics
    async fn get_stats(&self) -> VectorDataResult<StorageStats>;
}

/// Statistics about the vector storage
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Total number of vectors stored
    pub vector_count: usize,
    /// Declared vector dimension of the collection
    pub dimension: usize,
    /// Storage size in bytes (if available)
    pub storage_bytes: Option<u64>,
    /// Collection name
    pub collection_name: String,
    /// Storage backend type (e.g., "sqlite", "mock")
    pub storage_type: String,
}
