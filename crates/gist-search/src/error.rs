use gist_common::CorrelationId;
use gist_embeddings::EmbeddingError;
use gist_vector_data::VectorDataError;
use thiserror::Error;

/// Search-specific error types with correlation ID support
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No index found for {root}. Run `gist index {root}` first")]
    IndexNotFound { root: String },

    #[error("Search limit must be at least 1")]
    InvalidLimit,

    #[error("Query vector has {actual} dimensions but the index stores {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding generation failed for query '{query}' (correlation: {correlation_id})")]
    EmbeddingFailed {
        query: String,
        correlation_id: CorrelationId,
    },

    #[error(
        "Search timeout after {timeout_ms}ms for query '{query}' (correlation: {correlation_id})"
    )]
    SearchTimeout {
        query: String,
        timeout_ms: u64,
        correlation_id: CorrelationId,
    },

    #[error("Embedding error: {0}")]
    EmbeddingError(EmbeddingError),

    #[error("Vector storage error: {0}")]
    VectorDataError(VectorDataError),
}

// Width disagreements from either collaborator surface as one variant
impl From<VectorDataError> for SearchError {
    fn from(e: VectorDataError) -> Self {
        match e {
            VectorDataError::VectorDimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::VectorDataError(other),
        }
    }
}

impl From<EmbeddingError> for SearchError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::EmbeddingError(other),
        }
    }
}

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;
