//! Gist vector data storage crate
//!
//! Persists embedded code blocks and answers nearest-neighbour queries. The
//! production backend is a SQLite file under the indexed root; an in-memory
//! mock with failure toggles backs the tests.

pub mod error;
pub mod storage;

// Re-export main types
pub use error::{VectorDataError, VectorDataResult};
pub use gist_config::VectorStorageConfig;
pub use storage::{
    EmbeddedRecord, MockStorage, SqliteStorage, StorageSearchResult, StorageStats, StoredRecord,
    VectorStorage,
};
