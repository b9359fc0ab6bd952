pub mod hashing;
pub mod model;
pub mod service;
pub mod traits;

pub use hashing::HashingEmbeddingProvider;
pub use model::LocalEmbeddingProvider;
pub use service::DefaultEmbeddingService;
pub use traits::{EmbeddingProvider, EmbeddingService, EmbeddingStats};
