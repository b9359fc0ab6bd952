//! Gist embedding generation crate
//!
//! Converts code blocks and queries into fixed-dimension vectors. The real
//! backend runs a sentence-transformer locally with Candle; a deterministic
//! feature-hashing backend needs no model and is used offline and in tests.

pub mod embedding;
pub mod error;

// Re-export main types
pub use embedding::{
    DefaultEmbeddingService, EmbeddingProvider, EmbeddingService, EmbeddingStats,
    HashingEmbeddingProvider, LocalEmbeddingProvider,
};
pub use error::{EmbeddingError, EmbeddingResult};
pub use gist_config::EmbeddingConfig;
