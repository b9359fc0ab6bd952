//! Command handlers
//!
//! Each handler writes results to `out` and diagnostics to `err`, and maps
//! the outcome to a process exit code.

pub mod index;
pub mod search;
pub mod status;

use gist_config::ApplicationConfig;
use gist_embeddings::{DefaultEmbeddingService, EmbeddingResult, EmbeddingService};
use gist_vector_data::SqliteStorage;
use std::path::Path;
use std::sync::Arc;

fn open_storage(config: &ApplicationConfig, root: &Path) -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::for_root(root, &config.vector_storage))
}

async fn load_embedding_service(
    config: &ApplicationConfig,
) -> EmbeddingResult<Arc<dyn EmbeddingService>> {
    let service = DefaultEmbeddingService::from_config(&config.embedding).await?;
    Ok(Arc::new(service))
}
