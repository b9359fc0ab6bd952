//! Language registry and block extraction

pub mod extractor;
pub mod languages;

pub use extractor::{BlockExtractor, BlockKind, ExtractedBlock};
pub use languages::{
    LanguageConfig, get_language_config, get_language_from_extension, get_language_from_path,
};
