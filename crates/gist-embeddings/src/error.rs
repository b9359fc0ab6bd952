//! Error types for the gist-embeddings crate
//!
//! Embedding-specific errors for model loading, tokenization and inference.

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Error type for embedding operations
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model loading and initialization errors
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Tokenization and text processing errors
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// ML inference and computation errors
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider returned something other than one vector per input
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Provider produced vectors of an unexpected width
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Network and download errors
    #[error("Network error: {0}")]
    Network(String),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbeddingError {
    /// Create a configuration error
    pub fn config_error(msg: &str) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create an embedding generation error
    pub fn generation_error(msg: &str) -> Self {
        Self::Embedding(msg.to_string())
    }

    /// Create a model loading error
    pub fn model_load_error(msg: &str) -> Self {
        Self::ModelLoad(msg.to_string())
    }

    /// Create an inference error
    pub fn inference_error(msg: &str) -> Self {
        Self::Inference(msg.to_string())
    }
}
