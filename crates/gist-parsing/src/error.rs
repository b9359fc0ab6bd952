//! Error types for the parsing crate

use thiserror::Error;

/// Parsing-specific error types
#[derive(Error, Debug)]
pub enum ParsingError {
    /// Source could not be parsed into a usable syntax tree
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Grammar could not be loaded into the parser
    #[error("Tree-sitter error for language '{language}': {message}")]
    TreeSitter { language: String, message: String },
}

impl ParsingError {
    /// Create a parse error for a file
    pub fn parse_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for parsing operations
pub type ParsingResult<T> = Result<T, ParsingError>;
