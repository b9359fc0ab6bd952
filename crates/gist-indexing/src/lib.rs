//! Indexing orchestration crate for Gist
//!
//! This crate walks an indexing root and coordinates the parsing, embedding
//! and vector storage crates to turn its source files into stored records.

pub mod error;
pub mod indexing;

// Re-export error types
pub use error::{IndexerError, IndexerResult};

// Re-export main orchestration types
pub use indexing::{FileFailure, IndexRunStats, Indexer, SourceFile, Traverser};

// Re-export external crate types for convenience
pub use gist_embeddings::{EmbeddingError, EmbeddingResult};
pub use gist_parsing::{ParsingError, ParsingResult};
pub use gist_vector_data::{VectorDataError, VectorDataResult};
