//! Indexing orchestrator
//!
//! ```text
//! Start → (per file: Read → Extract → Hash → Batch) → Flush → Done
//! ```
//!
//! Collaborator failures before the first file abort the run. After that,
//! every failure is attributed to the file(s) it affected and the run goes on.

use crate::indexing::stats::IndexRunStats;
use crate::indexing::traversal::{SourceFile, Traverser};
use crate::{IndexerError, IndexerResult};
use gist_common::CorrelationId;
use gist_config::IndexingConfig;
use gist_embeddings::EmbeddingService;
use gist_parsing::BlockExtractor;
use gist_vector_data::{EmbeddedRecord, StoredRecord, VectorDataError, VectorStorage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

type EmbeddingServiceRef = Arc<dyn EmbeddingService>;
type VectorStorageRef = Arc<dyn VectorStorage>;

/// Files whose records are waiting to be embedded and stored together
#[derive(Default)]
struct PendingBatch {
    files: Vec<String>,
    records: Vec<StoredRecord>,
}

impl PendingBatch {
    fn push(&mut self, path: String, records: Vec<StoredRecord>) {
        self.files.push(path);
        self.records.extend(records);
    }

    const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Drives traversal, extraction, embedding and storage for one root
pub struct Indexer {
    embedding_service: EmbeddingServiceRef,
    storage: VectorStorageRef,
    extractor: BlockExtractor,
    config: IndexingConfig,
    batch_size: usize,
}

impl Indexer {
    /// Creates a new indexer with required dependencies.
    ///
    /// # Arguments
    ///
    /// * `embedding_service` - Service for generating embeddings (shared with search)
    /// * `storage` - Store scoped to the root's collection
    /// * `config` - Rebuild policy, syntax-error tolerance and exclusions
    /// * `batch_size` - Blocks accumulated before a flush
    pub fn new(
        embedding_service: EmbeddingServiceRef,
        storage: VectorStorageRef,
        config: IndexingConfig,
        batch_size: usize,
    ) -> Self {
        let extractor =
            BlockExtractor::new().with_syntax_error_tolerance(config.tolerate_syntax_errors);
        Self {
            embedding_service,
            storage,
            extractor,
            config,
            batch_size: batch_size.max(1),
        }
    }

    /// Index every supported file under `root`
    ///
    /// # Errors
    /// Returns `IndexerError::InvalidRoot` if `root` is not a directory,
    /// `IndexerError::CollaboratorUnavailable` if the embedding backend or
    /// the store cannot be prepared, and `IndexerError::DimensionMismatch` if
    /// they disagree on vector width. Per-file failures are reported in the
    /// returned stats instead.
    pub async fn run_index(&self, root: &Path) -> IndexerResult<IndexRunStats> {
        self.run_index_with_correlation(root, &CorrelationId::new())
            .await
    }

    /// [`Self::run_index`] under a caller-supplied correlation id
    ///
    /// # Errors
    /// Same as [`Self::run_index`].
    #[tracing::instrument(skip_all, fields(root = %root.display(), correlation_id = %correlation_id))]
    pub async fn run_index_with_correlation(
        &self,
        root: &Path,
        correlation_id: &CorrelationId,
    ) -> IndexerResult<IndexRunStats> {
        let start = Instant::now();

        let is_dir = tokio::fs::metadata(root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(IndexerError::InvalidRoot {
                path: root.display().to_string(),
            });
        }

        self.prepare_collaborators().await?;

        let mut stats = IndexRunStats::default();
        let mut pending = PendingBatch::default();
        let traverser = Traverser::new(root, &self.config.excluded_dirs);

        for file in traverser.files() {
            stats.files_scanned = stats.files_scanned.saturating_add(1);

            match self.extract_file(&file).await {
                Ok(records) if records.is_empty() => {
                    tracing::debug!("{} has no blocks", file.relative_path);
                    stats.files_indexed = stats.files_indexed.saturating_add(1);
                }
                Ok(records) => {
                    stats.blocks_extracted = stats.blocks_extracted.saturating_add(records.len());
                    pending.push(file.relative_path, records);
                    if pending.records.len() >= self.batch_size {
                        self.flush(&mut pending, &mut stats, correlation_id).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        file = %file.relative_path,
                        "Skipping file: {e}"
                    );
                    stats.record_failure(file.relative_path, e.to_string());
                }
            }
        }
        self.flush(&mut pending, &mut stats, correlation_id).await;

        stats.elapsed = start.elapsed();
        tracing::info!(
            correlation_id = %correlation_id,
            files_scanned = stats.files_scanned,
            blocks_stored = stats.blocks_stored,
            errors = stats.errors,
            "Index run complete"
        );
        Ok(stats)
    }

    /// Bring up both collaborators before touching any file
    async fn prepare_collaborators(&self) -> IndexerResult<()> {
        let provider = self.embedding_service.provider();
        provider
            .ensure_ready()
            .await
            .map_err(|e| IndexerError::collaborator_unavailable("embedding", e))?;

        let prepared = if self.config.full_rebuild {
            tracing::info!("Full rebuild: resetting collection");
            self.storage.reset().await
        } else {
            self.storage.ensure_collection().await
        };
        prepared.map_err(|e| match e {
            // An index built for another model, not a broken store
            VectorDataError::VectorDimensionMismatch { expected, .. } => {
                IndexerError::DimensionMismatch {
                    embedding: provider.embedding_dimension(),
                    storage: expected,
                }
            }
            other => IndexerError::collaborator_unavailable("store", other),
        })?;

        let storage_dimension = self
            .storage
            .get_stats()
            .await
            .map_err(|e| IndexerError::collaborator_unavailable("store", e))?
            .dimension;
        if storage_dimension != provider.embedding_dimension() {
            return Err(IndexerError::DimensionMismatch {
                embedding: provider.embedding_dimension(),
                storage: storage_dimension,
            });
        }

        Ok(())
    }

    /// Read, extract and stamp identity on one file's blocks
    async fn extract_file(&self, file: &SourceFile) -> IndexerResult<Vec<StoredRecord>> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| IndexerError::read(&file.relative_path, e))?;
        let content =
            String::from_utf8(bytes).map_err(|e| IndexerError::read(&file.relative_path, e))?;

        let blocks = self
            .extractor
            .extract(&file.relative_path, &content, file.language)?;

        Ok(blocks
            .into_iter()
            .map(|block| StoredRecord::from_block(block, file.language))
            .collect())
    }

    /// Embed and upsert everything pending; failures land on every file in the batch
    async fn flush(
        &self,
        pending: &mut PendingBatch,
        stats: &mut IndexRunStats,
        correlation_id: &CorrelationId,
    ) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        let file_count = batch.files.len();

        match self.embed_and_store(batch.records, correlation_id).await {
            Ok(stored) => {
                tracing::debug!("Flushed {stored} blocks from {file_count} files");
                stats.blocks_stored = stats.blocks_stored.saturating_add(stored);
                stats.files_indexed = stats.files_indexed.saturating_add(file_count);
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    files = file_count,
                    "Batch flush failed: {e}"
                );
                for path in batch.files {
                    stats.record_failure(path, e.to_string());
                }
            }
        }
    }

    async fn embed_and_store(
        &self,
        records: Vec<StoredRecord>,
        correlation_id: &CorrelationId,
    ) -> IndexerResult<usize> {
        let texts: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        let embeddings = self.embedding_service.generate_embeddings(texts).await?;

        let embedded: Vec<EmbeddedRecord> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| EmbeddedRecord { record, embedding })
            .collect();

        Ok(self.storage.upsert(&embedded, correlation_id).await?)
    }
}
