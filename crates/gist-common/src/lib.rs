//! Common utilities shared across gist crates
//!
//! Correlation ids for tracing, environment initialization and the
//! deterministic identity scheme for indexed blocks.

pub mod correlation;
pub mod identity;
pub mod init;

pub use correlation::CorrelationId;
pub use identity::{block_id, content_hash};
pub use init::initialize_environment;
