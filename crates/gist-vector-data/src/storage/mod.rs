pub mod mock;
pub mod record;
pub mod sqlite;
pub mod traits;
pub mod vector_math;

pub use self::mock::MockStorage;
pub use self::record::{EmbeddedRecord, StoredRecord};
pub use self::sqlite::SqliteStorage;
pub use self::traits::{StorageSearchResult, StorageStats, VectorStorage};
