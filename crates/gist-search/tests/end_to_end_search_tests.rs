//! Index a small polyglot tree, then query it through the search service

use gist_common::CorrelationId;
use gist_config::{IndexingConfig, SearchConfig, VectorStorageConfig};
use gist_embeddings::{DefaultEmbeddingService, EmbeddingService, HashingEmbeddingProvider};
use gist_indexing::Indexer;
use gist_search::{Search, SearchError, SearchService};
use gist_vector_data::{SqliteStorage, VectorStorage};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const DIM: usize = 384;

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

fn embedding() -> Arc<dyn EmbeddingService> {
    Arc::new(DefaultEmbeddingService::with_provider(
        Arc::new(HashingEmbeddingProvider::new(DIM)),
        8,
    ))
}

fn storage(root: &Path) -> Arc<dyn VectorStorage> {
    Arc::new(SqliteStorage::for_root(root, &VectorStorageConfig::default()))
}

fn search_service(root: &Path) -> Search {
    Search::new(embedding(), storage(root), root, &SearchConfig::default())
}

#[tokio::test]
async fn test_query_finds_method_with_its_class() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    fs::write(dir.path().join("auth.py"), AUTH_PY).expect("write auth.py");
    fs::write(dir.path().join("debounce.js"), DEBOUNCE_JS).expect("write debounce.js");

    let stats = Indexer::new(embedding(), storage(dir.path()), IndexingConfig::default(), 32)
        .run_index(dir.path())
        .await
        .expect("index run");
    assert_eq!(stats.errors, 0);

    let hits = search_service(dir.path())
        .search("refreshing an authentication token", 3, &CorrelationId::new())
        .await
        .expect("search");

    assert_eq!(hits.len(), 3);
    let top = &hits[0];
    assert!(top.record.source_path.ends_with("auth.py"));
    assert_eq!(top.record.enclosing_class.as_deref(), Some("Auth"));
    assert_eq!(top.record.name.as_deref(), Some("refresh_token"));
    assert!(top.record.start_line <= 5 && top.record.end_line >= 8);
    assert!(top.record.content.contains("def refresh_token"));
    assert_eq!(top.rank, 1);
}

#[tokio::test]
async fn test_search_before_index_is_actionable() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    fs::write(dir.path().join("auth.py"), AUTH_PY).expect("write auth.py");

    let err = search_service(dir.path())
        .search("token", 3, &CorrelationId::new())
        .await
        .expect_err("no index yet");

    assert!(matches!(err, SearchError::IndexNotFound { .. }));
    assert!(err.to_string().contains("gist index"));
    assert!(
        !dir.path().join(".gist").exists(),
        "a failed search must not create an index"
    );
}

#[tokio::test]
async fn test_index_built_with_other_width_is_rejected() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    fs::write(dir.path().join("debounce.js"), DEBOUNCE_JS).expect("write debounce.js");

    Indexer::new(embedding(), storage(dir.path()), IndexingConfig::default(), 32)
        .run_index(dir.path())
        .await
        .expect("index run");

    let narrow: Arc<dyn EmbeddingService> = Arc::new(DefaultEmbeddingService::with_provider(
        Arc::new(HashingEmbeddingProvider::new(64)),
        8,
    ));
    let err = Search::new(narrow, storage(dir.path()), dir.path(), &SearchConfig::default())
        .search("debounce", 1, &CorrelationId::new())
        .await
        .expect_err("width mismatch");

    assert!(matches!(
        err,
        SearchError::DimensionMismatch { expected: 384, actual: 64 }
    ));
}
