//! Persisted form of an extracted block

use gist_common::{block_id, content_hash};
use gist_parsing::{BlockKind, ExtractedBlock};
use serde::{Deserialize, Serialize};

/// A block as stored: location, metadata, verbatim content and identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Deterministic id over `(source_path, start_line, end_line, content_hash)`
    pub id: String,
    pub content_hash: String,
    /// Language tag from the file extension
    pub language: String,
    /// Root-relative path
    pub source_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: BlockKind,
    pub name: Option<String>,
    pub enclosing_class: Option<String>,
    pub content: String,
}

impl StoredRecord {
    /// Stamp identity onto an extracted block
    pub fn from_block(block: ExtractedBlock, language: &str) -> Self {
        let hash = content_hash(&block.content);
        let id = block_id(&block.source_path, block.start_line, block.end_line, &hash);

        Self {
            id,
            content_hash: hash,
            language: language.to_string(),
            source_path: block.source_path,
            start_line: block.start_line,
            end_line: block.end_line,
            kind: block.kind,
            name: block.name,
            enclosing_class: block.enclosing_class,
            content: block.content,
        }
    }
}

/// A record paired with its vector, ready for upsert
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedRecord {
    pub record: StoredRecord,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(content: &str, start: usize, end: usize) -> ExtractedBlock {
        ExtractedBlock {
            source_path: "pkg/auth.py".to_string(),
            start_line: start,
            end_line: end,
            kind: BlockKind::Function,
            content: content.to_string(),
            enclosing_class: Some("Auth".to_string()),
            name: Some("refresh_token".to_string()),
        }
    }

    #[test]
    fn test_from_block_stamps_identity() {
        let record = StoredRecord::from_block(block("def refresh_token(self): pass", 5, 7), "python");

        assert_eq!(record.content_hash, content_hash("def refresh_token(self): pass"));
        assert_eq!(
            record.id,
            block_id("pkg/auth.py", 5, 7, &record.content_hash)
        );
        assert_eq!(record.language, "python");
        assert_eq!(record.enclosing_class.as_deref(), Some("Auth"));
    }

    #[test]
    fn test_identical_blocks_get_identical_ids() {
        let a = StoredRecord::from_block(block("x", 1, 1), "python");
        let b = StoredRecord::from_block(block("x", 1, 1), "python");
        assert_eq!(a, b);

        let moved = StoredRecord::from_block(block("x", 2, 2), "python");
        assert_ne!(a.id, moved.id);
        assert_eq!(a.content_hash, moved.content_hash);
    }
}
