//! Search service trait

use super::search::SearchHit;
use crate::SearchResult;
use async_trait::async_trait;
use gist_common::CorrelationId;

/// Trait for search operations with correlation ID support
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Top-`limit` blocks for `query`, best first
    ///
    /// Hits are ordered by decreasing similarity with ties broken by record
    /// id, and ranked from 1.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Vec<SearchHit>>;

    /// Whether the root has been indexed
    async fn index_exists(&self) -> SearchResult<bool>;
}
