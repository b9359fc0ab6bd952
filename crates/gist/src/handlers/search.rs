use super::{load_embedding_service, open_storage};
use gist_common::CorrelationId;
use gist_config::ApplicationConfig;
use gist_search::{Search, SearchError, SearchHit, SearchService};
use gist_vector_data::VectorStorage;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// `=== path:start-end parent=Class ===`
pub fn hit_header(hit: &SearchHit) -> String {
    let record = &hit.record;
    let parent = record
        .enclosing_class
        .as_deref()
        .map(|class| format!(" parent={class}"))
        .unwrap_or_default();
    format!(
        "=== {}:{}-{}{parent} ===",
        record.source_path, record.start_line, record.end_line
    )
}

/// `gist search QUERY [ROOT] [-k N]`
///
/// # Errors
/// Returns embedding, storage and output failures. A missing index is
/// reported on `err` with a failing exit code instead.
pub async fn run(
    config: &ApplicationConfig,
    query: &str,
    root: &Path,
    limit: Option<usize>,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config, root);

    // Checked here too so a missing index never pays for a model load
    if !storage.collection_exists().await? {
        let missing = SearchError::IndexNotFound {
            root: root.display().to_string(),
        };
        writeln!(err, "{missing}")?;
        return Ok(ExitCode::FAILURE);
    }

    let embedding = load_embedding_service(config).await?;
    let search = Search::new(
        embedding,
        Arc::clone(&storage) as Arc<dyn VectorStorage>,
        root,
        &config.search,
    );
    let limit = limit.unwrap_or(config.search.default_limit);
    let result = search.search(query, limit, &CorrelationId::new()).await;
    storage.close().await;

    let hits = match result {
        Ok(hits) => hits,
        Err(e @ (SearchError::IndexNotFound { .. } | SearchError::InvalidLimit)) => {
            writeln!(err, "{e}")?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &hits)?;
        writeln!(out)?;
        return Ok(ExitCode::SUCCESS);
    }

    if hits.is_empty() {
        writeln!(err, "No results")?;
    }
    for hit in &hits {
        writeln!(out, "{}", hit_header(hit))?;
        writeln!(out, "{}", hit.record.content)?;
        writeln!(out)?;
    }
    Ok(ExitCode::SUCCESS)
}
