use super::{load_embedding_service, open_storage};
use gist_config::ApplicationConfig;
use gist_indexing::{Indexer, IndexerError};
use gist_vector_data::VectorStorage;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// `gist index [ROOT]`
///
/// Per-file failures go to `err`; the run still succeeds.
///
/// # Errors
/// Returns run-fatal indexing errors and output write failures
pub async fn run(
    config: &ApplicationConfig,
    root: &Path,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    // Reject a bad root before paying for a model load
    let is_dir = tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir());
    if !is_dir {
        return Err(IndexerError::InvalidRoot {
            path: root.display().to_string(),
        }
        .into());
    }

    let embedding = load_embedding_service(config)
        .await
        .map_err(|e| IndexerError::collaborator_unavailable("embedding", e))?;
    let storage = open_storage(config, root);

    let indexer = Indexer::new(
        embedding,
        Arc::clone(&storage) as Arc<dyn VectorStorage>,
        config.indexing.clone(),
        config.embedding.performance.indexer_batch_size,
    );
    let result = indexer.run_index(root).await;
    storage.close().await;
    let stats = result?;

    for failure in &stats.failures {
        writeln!(err, "{}: {}", failure.path, failure.reason)?;
    }
    writeln!(out, "{stats}")?;

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::hashing_config;
    use std::fs;

    #[test]
    fn test_index_reports_failures_and_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("ok.py"), "def ok():\n    return 1\n").unwrap();
        fs::write(dir.path().join("bad.py"), "def bad(:\n").unwrap();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = tokio_test::block_on(run(&hashing_config(), dir.path(), &mut out, &mut err))
            .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(out.starts_with("Indexed 1/2 files, stored 1/1 blocks, 1 errors"));
        assert!(err.starts_with("bad.py: Failed to parse bad.py"));
        assert!(dir.path().join(".gist/index.sqlite").exists());
    }

    #[test]
    fn test_missing_root_is_rejected_before_model_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        // The real model provider; reaching it would mean a download
        let mut config = ApplicationConfig::default();
        config.embedding.cache.dir = Some(dir.path().join("models").display().to_string());

        let err = tokio_test::block_on(run(&config, &missing, &mut Vec::new(), &mut Vec::new()))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<IndexerError>(),
            Some(IndexerError::InvalidRoot { .. })
        ));
        assert!(!dir.path().join("models").exists());
    }
}
