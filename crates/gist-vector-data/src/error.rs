//! Error types for vector data storage operations

use thiserror::Error;

/// Result type alias for vector data operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors that can occur during vector storage operations
#[derive(Error, Debug)]
pub enum VectorDataError {
    /// Storage backend is unavailable or connection failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Vector width disagrees with the collection's declared dimension
    #[error("Vector dimension mismatch: collection stores {expected}-dimensional vectors, got {actual}")]
    VectorDimensionMismatch { expected: usize, actual: usize },

    /// The named collection has not been created
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Storage backend specific error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error around the database file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
