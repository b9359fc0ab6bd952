//! Gist parsing crate
//!
//! Maps file extensions to tree-sitter grammars and walks syntax trees to
//! extract functions, methods and classes as line-addressed code blocks.

pub mod error;
pub mod parsing;

// Re-export main types
pub use error::{ParsingError, ParsingResult};
pub use parsing::{
    BlockExtractor, BlockKind, ExtractedBlock, LanguageConfig, get_language_config,
    get_language_from_extension, get_language_from_path,
};
