//! Trait abstractions for embedding generation
//!
//! Providers turn text into vectors; the service batches requests and keeps
//! statistics. Both are object-safe so the orchestrator and search executor
//! can hold them as `Arc<dyn ...>` and tests can substitute a deterministic
//! provider.

use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;

/// Trait for embedding generation providers
///
/// Implementations must be deterministic for identical input and a fixed
/// model version, and every vector must have `embedding_dimension()` entries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts, one per input
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Get the dimensionality of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the maximum number of tokens this provider can handle
    fn max_tokens(&self) -> usize;

    /// Get the name/description of the embedding model
    fn model_name(&self) -> &str;

    /// Check if the model is ready for use
    async fn is_ready(&self) -> bool;

    /// Ensure the model is loaded and ready
    async fn ensure_ready(&self) -> EmbeddingResult<()>;
}

/// Service for managing embedding generation
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate embeddings for code blocks, batching as configured
    async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single search query
    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        self.generate_embeddings(vec![query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::generation_error("provider returned no vector for query"))
    }

    /// Get the embedding provider being used
    fn provider(&self) -> &dyn EmbeddingProvider;

    /// Get service statistics
    async fn get_stats(&self) -> EmbeddingStats;
}

/// Statistics about embedding generation
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStats {
    /// Total number of embeddings generated
    pub total_embeddings: usize,

    /// Total number of batches processed
    pub total_batches: usize,

    /// Average batch processing time in milliseconds
    pub avg_batch_time_ms: f64,

    /// Model name being used
    pub model_name: String,

    /// Model dimension
    pub embedding_dimension: usize,
}
