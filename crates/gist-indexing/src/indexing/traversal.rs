//! Directory traversal
//!
//! Walks an indexing root in file-name order, never descending into excluded
//! directory names, honouring `.gitignore` files whether or not the root is a
//! git checkout, and yielding only files with a supported extension.
//! Symlinked files are yielded; symlinked directories are not entered.

use gist_parsing::get_language_from_path;
use ignore::{DirEntry, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file selected for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute or caller-relative path used for reading
    pub path: PathBuf,
    /// Path relative to the indexing root, `/`-separated
    pub relative_path: String,
    /// Language tag from the extension table
    pub language: &'static str,
}

/// Lazy walker over the supported files under a root
#[derive(Debug, Clone)]
pub struct Traverser {
    root: PathBuf,
    excluded_dirs: Arc<HashSet<String>>,
}

impl Traverser {
    pub fn new(root: impl Into<PathBuf>, excluded_dirs: &[String]) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: Arc::new(excluded_dirs.iter().cloned().collect()),
        }
    }

    /// Supported files in deterministic order
    ///
    /// Unreadable entries are skipped with a warning.
    pub fn files(&self) -> impl Iterator<Item = SourceFile> + use<> {
        let excluded = Arc::clone(&self.excluded_dirs);
        let root = self.root.clone();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .git_ignore(true)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| !is_excluded_dir(entry, &excluded));

        builder.build().filter_map(move |entry| match entry {
            Ok(entry) => source_file(&root, &entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable path: {err}");
                None
            }
        })
    }
}

fn is_excluded_dir(entry: &DirEntry, excluded: &HashSet<String>) -> bool {
    // The root itself is always walked, whatever its name
    entry.depth() > 0
        && entry.file_type().is_some_and(|t| t.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excluded.contains(name))
}

fn source_file(root: &Path, entry: &DirEntry) -> Option<SourceFile> {
    let path = entry.path();
    let is_file = entry
        .file_type()
        .is_some_and(|t| t.is_file() || (t.is_symlink() && path.is_file()));
    if !is_file {
        return None;
    }

    let language = get_language_from_path(path)?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative_path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Some(SourceFile {
        path: path.to_path_buf(),
        relative_path,
        language,
    })
}
