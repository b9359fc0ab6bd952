//! End-to-end indexing runs against a real SQLite store and the hashing embedder

use gist_config::{IndexingConfig, VectorStorageConfig};
use gist_embeddings::{DefaultEmbeddingService, EmbeddingService, HashingEmbeddingProvider};
use gist_indexing::{Indexer, IndexerError};
use gist_vector_data::{SqliteStorage, StoredRecord, VectorStorage};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const DIM: usize = 128;

const AUTH_PY: &str = r#"class Auth:
    def __init__(self, client):
        self.client = client

    def refresh_token(self):
        """Refresh the authentication token before it expires."""
        self.token = self.client.renew(self.token)
        return self.token

    def logout(self, store):
        store.clear(self.client)
        audit.write("logout", self.client)
"#;

const DEBOUNCE_JS: &str = r"function debounce(fn, waitMs) {
  let timer;
  return (...args) => {
    clearTimeout(timer);
    timer = setTimeout(() => fn(...args), waitMs);
  };
}
";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(path, content).expect("write fixture");
}

fn storage_for(root: &Path) -> Arc<SqliteStorage> {
    storage_with_dimension(root, DIM)
}

fn storage_with_dimension(root: &Path, dimension: usize) -> Arc<SqliteStorage> {
    let config = VectorStorageConfig {
        vector_dimension: dimension,
        ..VectorStorageConfig::default()
    };
    Arc::new(SqliteStorage::for_root(root, &config))
}

fn indexer(storage: &Arc<SqliteStorage>, full_rebuild: bool) -> Indexer {
    indexer_with_dimension(storage, full_rebuild, DIM)
}

fn indexer_with_dimension(
    storage: &Arc<SqliteStorage>,
    full_rebuild: bool,
    dimension: usize,
) -> Indexer {
    let embedding: Arc<dyn EmbeddingService> = Arc::new(DefaultEmbeddingService::with_provider(
        Arc::new(HashingEmbeddingProvider::new(dimension)),
        4,
    ));
    let config = IndexingConfig {
        full_rebuild,
        ..IndexingConfig::default()
    };
    Indexer::new(
        embedding,
        Arc::clone(storage) as Arc<dyn VectorStorage>,
        config,
        4,
    )
}

fn ids(records: &[StoredRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn test_two_file_fixture_is_fully_indexed() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), "src/auth.py", AUTH_PY);
    write(dir.path(), "web/debounce.js", DEBOUNCE_JS);
    let storage = storage_for(dir.path());

    let stats = indexer(&storage, true)
        .run_index(dir.path())
        .await
        .expect("index run");

    assert_eq!(stats.files_scanned, 2);
    assert_eq!(stats.files_indexed, 2);
    // class Auth + three methods + debounce
    assert_eq!(stats.blocks_extracted, 5);
    assert_eq!(stats.blocks_stored, 5);
    assert_eq!(stats.errors, 0);
    assert!(dir.path().join(".gist/index.sqlite").exists());

    let records = storage.fetch_all_records().await.expect("records");
    let refresh = records
        .iter()
        .find(|r| r.name.as_deref() == Some("refresh_token"))
        .expect("refresh_token stored");
    assert_eq!(refresh.source_path, "src/auth.py");
    assert_eq!(refresh.enclosing_class.as_deref(), Some("Auth"));
    assert_eq!((refresh.start_line, refresh.end_line), (5, 8));
    assert_eq!(refresh.language, "python");

    let debounce = records
        .iter()
        .find(|r| r.name.as_deref() == Some("debounce"))
        .expect("debounce stored");
    assert_eq!(debounce.source_path, "web/debounce.js");
    assert_eq!(debounce.enclosing_class, None);
}

#[tokio::test]
async fn test_reindexing_unchanged_tree_is_idempotent() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), "src/auth.py", AUTH_PY);
    write(dir.path(), "web/debounce.js", DEBOUNCE_JS);
    let storage = storage_for(dir.path());

    for full_rebuild in [true, false] {
        let indexer = indexer(&storage, full_rebuild);
        indexer.run_index(dir.path()).await.expect("first run");
        let first = storage.fetch_all_records().await.expect("records");

        indexer.run_index(dir.path()).await.expect("second run");
        let second = storage.fetch_all_records().await.expect("records");

        assert_eq!(first, second, "full_rebuild = {full_rebuild}");
    }
}

#[tokio::test]
async fn test_syntax_error_is_isolated_to_its_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), "a_broken.py", "def broken(:\n    return\n");
    write(dir.path(), "b_valid.js", DEBOUNCE_JS);
    let storage = storage_for(dir.path());

    let stats = indexer(&storage, true)
        .run_index(dir.path())
        .await
        .expect("run continues past the broken file");

    assert_eq!(stats.errors, 1);
    assert_eq!(stats.failures[0].path, "a_broken.py");
    assert!(stats.failures[0].reason.contains("a_broken.py"));
    assert_eq!(stats.files_indexed, 1);

    let records = storage.fetch_all_records().await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_path, "b_valid.js");
}

#[tokio::test]
async fn test_editing_one_function_changes_only_its_record() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(
        dir.path(),
        "math.py",
        "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n",
    );
    let storage = storage_for(dir.path());
    let indexer = indexer(&storage, false);

    indexer.run_index(dir.path()).await.expect("first run");
    let before = storage.fetch_all_records().await.expect("records");

    write(
        dir.path(),
        "math.py",
        "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return b - a\n",
    );
    indexer.run_index(dir.path()).await.expect("second run");
    let after = storage.fetch_all_records().await.expect("records");

    let added: Vec<_> = ids(&after).difference(&ids(&before)).cloned().collect();
    assert_eq!(added.len(), 1, "only the edited function gets a new id");
    let edited = after
        .iter()
        .find(|r| r.id == added[0])
        .expect("new record present");
    assert_eq!(edited.name.as_deref(), Some("sub"));
    assert!(edited.content.contains("b - a"));

    // Untouched blocks keep their exact records; the old `sub` stays behind
    // until a full rebuild
    for record in &before {
        assert!(after.contains(record));
    }
}

#[tokio::test]
async fn test_full_rebuild_drops_stale_records() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), "gone.py", "def obsolete():\n    pass\n");
    let storage = storage_for(dir.path());

    indexer(&storage, true)
        .run_index(dir.path())
        .await
        .expect("first run");
    fs::remove_file(dir.path().join("gone.py")).expect("remove");
    write(dir.path(), "kept.py", "def current():\n    pass\n");

    indexer(&storage, true)
        .run_index(dir.path())
        .await
        .expect("rebuild");
    let records = storage.fetch_all_records().await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_path, "kept.py");
}

#[tokio::test]
async fn test_ignored_and_excluded_paths_are_not_indexed() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), ".gitignore", "vendor/\n");
    write(dir.path(), "app.py", "def main():\n    pass\n");
    write(dir.path(), "vendor/lib.py", "def vendored():\n    pass\n");
    write(dir.path(), "node_modules/pkg/index.js", "function dep() {}\n");
    let storage = storage_for(dir.path());

    let stats = indexer(&storage, true)
        .run_index(dir.path())
        .await
        .expect("index run");
    assert_eq!(stats.files_scanned, 1);

    let records = storage.fetch_all_records().await.expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("main"));
}

#[tokio::test]
async fn test_reindex_with_wider_model_reports_dimension_mismatch() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    write(dir.path(), "app.py", "def main():\n    pass\n");

    let narrow = storage_for(dir.path());
    indexer(&narrow, true)
        .run_index(dir.path())
        .await
        .expect("first run");
    narrow.close().await;

    let wide = storage_with_dimension(dir.path(), DIM * 2);
    let err = indexer_with_dimension(&wide, false, DIM * 2)
        .run_index(dir.path())
        .await
        .expect_err("existing index is narrower");
    assert!(
        matches!(
            err,
            IndexerError::DimensionMismatch { embedding, storage } if embedding == DIM * 2 && storage == DIM
        ),
        "unexpected error: {err:?}"
    );

    // The old index is left intact
    let records = wide.fetch_all_records().await.expect("records");
    assert_eq!(records.len(), 1);
}
