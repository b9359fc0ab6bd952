use super::open_storage;
use gist_config::ApplicationConfig;
use gist_search::SearchError;
use gist_vector_data::VectorStorage;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

/// `gist status [ROOT]`
///
/// # Errors
/// Returns storage and output failures
pub async fn run(
    config: &ApplicationConfig,
    root: &Path,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config, root);

    if !storage.collection_exists().await? {
        let missing = SearchError::IndexNotFound {
            root: root.display().to_string(),
        };
        writeln!(err, "{missing}")?;
        return Ok(ExitCode::FAILURE);
    }

    let stats = storage.get_stats().await;
    storage.close().await;
    let stats = stats?;

    writeln!(out, "Index: {}", storage.database_path().display())?;
    writeln!(out, "Collection: {} ({})", stats.collection_name, stats.storage_type)?;
    writeln!(out, "Records: {}", stats.vector_count)?;
    writeln!(out, "Dimension: {}", stats.dimension)?;
    if let Some(bytes) = stats.storage_bytes {
        writeln!(out, "Size: {bytes} bytes")?;
    }
    Ok(ExitCode::SUCCESS)
}
