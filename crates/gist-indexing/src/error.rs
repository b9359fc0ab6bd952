//! Structured error types for the indexing crate
//!
//! Per-file failures (`Read`, `Parsing`) are soft: the orchestrator records
//! them and moves on. Everything else aborts the run.

use gist_embeddings::EmbeddingError;
use gist_parsing::ParsingError;
use gist_vector_data::VectorDataError;
use thiserror::Error;

/// Structured error enum for indexing runs
#[derive(Error, Debug)]
pub enum IndexerError {
    // ========== Per-file Errors ==========
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    // ========== Run-fatal Errors ==========
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: String,
        message: String,
    },

    #[error("Indexing root {path} is not a readable directory")]
    InvalidRoot { path: String },

    #[error("Embedding dimension ({embedding}) does not match store dimension ({storage})")]
    DimensionMismatch { embedding: usize, storage: usize },

    // ========== Batch Errors ==========
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector storage error: {0}")]
    VectorData(#[from] VectorDataError),
}

impl IndexerError {
    /// A file that could not be read or decoded
    pub fn read(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// A backend that could not be brought up before the run started
    pub fn collaborator_unavailable(
        collaborator: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            message: cause.to_string(),
        }
    }
}

pub type IndexerResult<T> = Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing_errors_pass_through_unchanged() {
        let err = IndexerError::from(ParsingError::parse_error("a.py", "syntax error at 3:1"));
        assert_eq!(err.to_string(), "Failed to parse a.py: syntax error at 3:1");
    }

    #[test]
    fn test_messages_name_the_file() {
        let err = IndexerError::read("src/auth.py", "stream did not contain valid UTF-8");
        assert_eq!(
            err.to_string(),
            "Failed to read src/auth.py: stream did not contain valid UTF-8"
        );

        let err = IndexerError::collaborator_unavailable("embedding", "model download failed");
        assert_eq!(err.to_string(), "embedding unavailable: model download failed");
    }
}
