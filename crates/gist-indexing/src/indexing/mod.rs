pub mod indexer;
pub mod stats;
pub mod traversal;

pub use indexer::Indexer;
pub use stats::{FileFailure, IndexRunStats};
pub use traversal::{SourceFile, Traverser};
