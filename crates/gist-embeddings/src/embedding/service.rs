//! Concrete implementation of the `EmbeddingService`

use super::hashing::HashingEmbeddingProvider;
use super::model::LocalEmbeddingProvider;
use super::traits::{EmbeddingProvider, EmbeddingService, EmbeddingStats};
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use gist_config::{EmbeddingConfig, EmbeddingProvider as ProviderKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Default implementation of `EmbeddingService`
///
/// Splits requests into provider-sized batches and validates that every
/// batch comes back with one vector of the advertised width per input.
pub struct DefaultEmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    stats: Arc<RwLock<EmbeddingStats>>,
    batch_size: usize,
}

impl DefaultEmbeddingService {
    /// Build the provider selected by `config` and wrap it in a service
    ///
    /// # Errors
    /// Returns the provider's load error (download, config mismatch, weights)
    pub async fn from_config(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            ProviderKind::Local => Arc::new(LocalEmbeddingProvider::load(config).await?),
            ProviderKind::Hashing => {
                Arc::new(HashingEmbeddingProvider::new(config.model.dimensions))
            }
        };
        Ok(Self::with_provider(
            provider,
            config.performance.indexer_batch_size,
        ))
    }

    /// Create with a custom provider
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        let stats = Arc::new(RwLock::new(EmbeddingStats {
            model_name: provider.model_name().to_string(),
            embedding_dimension: provider.embedding_dimension(),
            ..Default::default()
        }));

        Self {
            provider,
            stats,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingService for DefaultEmbeddingService {
    async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.provider.ensure_ready().await?;

        let expected_dimension = self.provider.embedding_dimension();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = Instant::now();

            let embeddings = self.provider.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::generation_error(&format!(
                    "provider returned {} vectors for {} inputs",
                    embeddings.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embeddings.iter().find(|e| e.len() != expected_dimension) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: expected_dimension,
                    actual: bad.len(),
                });
            }

            all_embeddings.extend(embeddings);

            let elapsed = start.elapsed().as_secs_f64() * 1000.0;
            let mut stats = self.stats.write().await;
            stats.total_embeddings = stats.total_embeddings.saturating_add(batch.len());
            stats.total_batches = stats.total_batches.saturating_add(1);

            // Running average
            let count = stats.total_batches as f64;
            stats.avg_batch_time_ms = stats.avg_batch_time_ms.mul_add(count - 1.0, elapsed) / count;
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    async fn get_stats(&self) -> EmbeddingStats {
        self.stats.read().await.clone()
    }
}
