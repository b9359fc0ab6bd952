//! Deterministic identity for indexed code blocks
//!
//! Both functions are pure: no randomness, no counters, no normalization.
//! Re-indexing unchanged input therefore reproduces identical ids, which is
//! what makes store upserts idempotent.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the UTF-8 bytes of `content`
///
/// Whitespace and line endings are hashed verbatim. Callers that want
/// normalization must normalize before hashing.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable block identifier derived from location and content
///
/// The id is the SHA-256 hex digest of `path:start:end:hash`. The path is
/// the only free-form component and the three trailing fields are numeric or
/// fixed-width hex, so the encoding cannot be ambiguous even when the path
/// itself contains `:`.
pub fn block_id(source_path: &str, start_line: usize, end_line: usize, content_hash: &str) -> String {
    let stable = format!("{source_path}:{start_line}:{end_line}:{content_hash}");
    let mut hasher = Sha256::new();
    hasher.update(stable.as_bytes());
    format!("{:x}", hasher.finalize())
}
