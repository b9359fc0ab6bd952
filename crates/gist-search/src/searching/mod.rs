pub mod search;
pub mod service;

pub use search::{Search, SearchHit};
pub use service::SearchService;
