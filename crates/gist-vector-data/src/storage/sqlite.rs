//! SQLite-backed vector storage
//!
//! One database file per indexed root, at `<root>/<index_dir>/<database_file>`.
//! Layout:
//!
//! ```text
//! collections(name PK, dimension, created_at)
//! records(collection, id, source_path, start_line, end_line, kind, name,
//!         enclosing_class, language, content_hash, content, embedding BLOB)
//!         PRIMARY KEY (collection, id)
//! ```
//!
//! Vectors are little-endian `f32` blobs; similarity is brute-force cosine.

use crate::storage::record::{EmbeddedRecord, StoredRecord};
use crate::storage::traits::{StorageSearchResult, StorageStats, VectorStorage};
use crate::storage::vector_math::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::{VectorDataError, VectorDataResult};
use async_trait::async_trait;
use gist_common::CorrelationId;
use gist_config::VectorStorageConfig;
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn to_i64(value: usize, field: &str) -> VectorDataResult<i64> {
    i64::try_from(value)
        .map_err(|_| VectorDataError::Serialization(format!("{field} out of range: {value}")))
}

fn to_usize(value: i64, field: &str) -> VectorDataResult<usize> {
    usize::try_from(value)
        .map_err(|_| VectorDataError::Serialization(format!("{field} out of range: {value}")))
}

/// Vector storage in a local SQLite database
pub struct SqliteStorage {
    db_path: PathBuf,
    collection_name: String,
    dimension: usize,
    pool: OnceCell<SqlitePool>,
}

impl SqliteStorage {
    /// Storage for a database file; nothing is opened until first use
    pub fn new(
        db_path: impl Into<PathBuf>,
        collection_name: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            collection_name: collection_name.into(),
            dimension,
            pool: OnceCell::new(),
        }
    }

    /// Storage for an indexing root, laid out per `config`
    pub fn for_root(root: &Path, config: &VectorStorageConfig) -> Self {
        Self::new(
            config.database_path(root),
            config.collection_name.clone(),
            config.vector_dimension,
        )
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connection pool if it was opened
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    async fn pool(&self) -> VectorDataResult<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                if let Some(parent) = self.db_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let options = SqliteConnectOptions::new()
                    .filename(&self.db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(BUSY_TIMEOUT);

                let pool = SqlitePoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        VectorDataError::StorageUnavailable(format!(
                            "Failed to open {}: {e}",
                            self.db_path.display()
                        ))
                    })?;

                run_migrations(&pool).await?;
                tracing::debug!("Opened vector store at {}", self.db_path.display());
                Ok(pool)
            })
            .await
    }

    async fn collection_dimension(&self) -> VectorDataResult<Option<usize>> {
        let pool = self.pool().await?;
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(&self.collection_name)
                .fetch_optional(pool)
                .await?;
        dimension.map(|d| to_usize(d, "dimension")).transpose()
    }

    async fn require_dimension(&self) -> VectorDataResult<usize> {
        self.collection_dimension()
            .await?
            .ok_or_else(|| VectorDataError::CollectionNotFound(self.collection_name.clone()))
    }
}

async fn run_migrations(pool: &SqlitePool) -> VectorDataResult<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dimension INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            source_path TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            kind TEXT NOT NULL,
            name TEXT,
            enclosing_class TEXT,
            language TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_source_path ON records(collection, source_path)")
        .execute(pool)
        .await?;

    Ok(())
}

fn row_to_record(row: &SqliteRow) -> VectorDataResult<StoredRecord> {
    let kind: String = row.try_get("kind")?;
    Ok(StoredRecord {
        id: row.try_get("id")?,
        content_hash: row.try_get("content_hash")?,
        language: row.try_get("language")?,
        source_path: row.try_get("source_path")?,
        start_line: to_usize(row.try_get("start_line")?, "start_line")?,
        end_line: to_usize(row.try_get("end_line")?, "end_line")?,
        kind: kind.parse().map_err(VectorDataError::Serialization)?,
        name: row.try_get("name")?,
        enclosing_class: row.try_get("enclosing_class")?,
        content: row.try_get("content")?,
    })
}

#[async_trait]
impl VectorStorage for SqliteStorage {
    #[tracing::instrument(skip_all, fields(correlation_id = %correlation_id, count = records.len()))]
    async fn upsert(
        &self,
        records: &[EmbeddedRecord],
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let dimension = self.require_dimension().await?;
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(VectorDataError::VectorDimensionMismatch {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }

        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        for embedded in records {
            let record = &embedded.record;
            sqlx::query(
                r"
                INSERT OR REPLACE INTO records (
                    collection, id, source_path, start_line, end_line, kind, name,
                    enclosing_class, language, content_hash, content, embedding
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&self.collection_name)
            .bind(&record.id)
            .bind(&record.source_path)
            .bind(to_i64(record.start_line, "start_line")?)
            .bind(to_i64(record.end_line, "end_line")?)
            .bind(record.kind.as_str())
            .bind(&record.name)
            .bind(&record.enclosing_class)
            .bind(&record.language)
            .bind(&record.content_hash)
            .bind(&record.content)
            .bind(vec_to_blob(&embedded.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Upserted {} records", records.len());
        Ok(records.len())
    }

    #[tracing::instrument(skip_all, fields(correlation_id = %correlation_id, limit = limit))]
    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<StorageSearchResult>> {
        let dimension = self.require_dimension().await?;
        if query_embedding.len() != dimension {
            return Err(VectorDataError::VectorDimensionMismatch {
                expected: dimension,
                actual: query_embedding.len(),
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT * FROM records WHERE collection = ?")
            .bind(&self.collection_name)
            .fetch_all(pool)
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            let vector = blob_to_vec(&blob).ok_or_else(|| {
                VectorDataError::Serialization("embedding blob is not a whole number of f32".into())
            })?;
            if vector.len() != dimension {
                return Err(VectorDataError::VectorDimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            results.push(StorageSearchResult {
                record: row_to_record(row)?,
                similarity: cosine_similarity(&query_embedding, &vector),
            });
        }

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(limit);

        tracing::debug!(
            "Search scanned {} records, returning {}",
            rows.len(),
            results.len()
        );
        Ok(results)
    }

    async fn fetch_all_records(&self) -> VectorDataResult<Vec<StoredRecord>> {
        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT * FROM records WHERE collection = ? ORDER BY id")
            .bind(&self.collection_name)
            .fetch_all(pool)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn collection_exists(&self) -> VectorDataResult<bool> {
        // Never create the database just to answer "no"
        if self.pool.get().is_none() && !tokio::fs::try_exists(&self.db_path).await? {
            return Ok(false);
        }
        Ok(self.collection_dimension().await?.is_some())
    }

    async fn ensure_collection(&self) -> VectorDataResult<()> {
        match self.collection_dimension().await? {
            Some(existing) if existing != self.dimension => {
                Err(VectorDataError::VectorDimensionMismatch {
                    expected: existing,
                    actual: self.dimension,
                })
            }
            Some(_) => Ok(()),
            None => {
                let pool = self.pool().await?;
                sqlx::query("INSERT INTO collections (name, dimension, created_at) VALUES (?, ?, ?)")
                    .bind(&self.collection_name)
                    .bind(to_i64(self.dimension, "dimension")?)
                    .bind(chrono::Utc::now())
                    .execute(pool)
                    .await?;
                tracing::info!(
                    "Created collection '{}' ({} dims)",
                    self.collection_name,
                    self.dimension
                );
                Ok(())
            }
        }
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(&self.collection_name)
            .execute(&mut *tx)
            .await?;
        let dropped = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(&self.collection_name)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;
        if dropped {
            tracing::info!("Dropped collection '{}'", self.collection_name);
        }
        Ok(dropped)
    }

    async fn get_stats(&self) -> VectorDataResult<StorageStats> {
        let dimension = self.require_dimension().await?;
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection_name)
            .fetch_one(pool)
            .await?;

        Ok(StorageStats {
            vector_count: to_usize(count, "count")?,
            dimension,
            storage_bytes: tokio::fs::metadata(&self.db_path).await.ok().map(|m| m.len()),
            collection_name: self.collection_name.clone(),
            storage_type: "sqlite".to_string(),
        })
    }
}
