use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// A file the run could not index, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// Summary of one indexing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexRunStats {
    /// Supported files yielded by traversal
    pub files_scanned: usize,
    /// Files whose blocks were all stored (including files with no blocks)
    pub files_indexed: usize,
    pub blocks_extracted: usize,
    pub blocks_stored: usize,
    /// Files that failed; always `failures.len()`
    pub errors: usize,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

impl IndexRunStats {
    pub(crate) fn record_failure(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.errors = self.errors.saturating_add(1);
        self.failures.push(FileFailure {
            path: path.into(),
            reason: reason.into(),
        });
    }

    pub const fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for IndexRunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed {}/{} files, stored {}/{} blocks, {} errors in {:.2}s",
            self.files_indexed,
            self.files_scanned,
            self.blocks_stored,
            self.blocks_extracted,
            self.errors,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_and_errors_agree() {
        let mut stats = IndexRunStats::default();
        assert!(stats.is_clean());

        stats.record_failure("broken.py", "Failed to parse broken.py: syntax error");
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.failures[0].path, "broken.py");
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_summary_line() {
        let stats = IndexRunStats {
            files_scanned: 3,
            files_indexed: 2,
            blocks_extracted: 7,
            blocks_stored: 5,
            errors: 1,
            failures: Vec::new(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            stats.to_string(),
            "Indexed 2/3 files, stored 5/7 blocks, 1 errors in 1.50s"
        );
    }
}
