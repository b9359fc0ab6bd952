//! Gist search crate
//!
//! Answers natural-language queries against an indexed root: embed the
//! query, look up the nearest stored blocks, and rank them.

pub mod error;
pub mod searching;

// Re-export main types
pub use error::{SearchError, SearchResult};
pub use searching::{
    search::{Search, SearchHit},
    service::SearchService,
};
