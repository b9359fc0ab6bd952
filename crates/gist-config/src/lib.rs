//! Centralized configuration management for gist
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. An optional TOML file (partial files fall back to defaults per field)
//! 3. Environment variable overrides
//! 4. Runtime validation

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};

use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

// Embedding Model Configuration
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_MODEL_REVISION: &str = "main";
pub const DEFAULT_EMBEDDING_MODEL_DIMENSIONS: usize = 384; // MiniLM-L6 hidden size
pub const DEFAULT_EMBEDDING_MODEL_MAX_TOKENS: usize = 256;

// Performance Configuration
pub const DEFAULT_EMBEDDING_INDEXER_BATCH_SIZE: usize = 32;
pub const DEFAULT_EMBEDDING_USE_GPU: bool = true;

// Indexing Configuration
pub const DEFAULT_INDEXING_FULL_REBUILD: bool = true;
pub const DEFAULT_INDEXING_TOLERATE_SYNTAX_ERRORS: bool = false;

/// Directory names never descended into, at any depth
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".gist",
    ".venv",
    ".mypy_cache",
    ".pytest_cache",
    "__pycache__",
    "node_modules",
    "dist",
    "build",
    ".tox",
    ".ruff_cache",
    ".idea",
    ".vscode",
    "target",
];

// Vector Storage Configuration
pub const DEFAULT_INDEX_DIR: &str = ".gist";
pub const DEFAULT_DATABASE_FILE: &str = "index.sqlite";
pub const DEFAULT_COLLECTION_NAME: &str = "code";
pub const DEFAULT_VECTOR_DIMENSION: usize = 384; // Matches MiniLM-L6

// Search Configuration
pub const DEFAULT_SEARCH_LIMIT: usize = 3;
pub const DEFAULT_SEARCH_TIMEOUT_SECONDS: u64 = 30;

// Telemetry Configuration
pub const DEFAULT_TRACING_LEVEL: &str = "info";

const TRACING_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Parse an environment variable, ignoring unset or malformed values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Core configuration for the entire gist application
///
/// All settings have safe defaults and can be overridden via a TOML file and
/// environment variables.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Embedding generation configuration
    pub embedding: EmbeddingConfig,

    /// Indexing run configuration
    pub indexing: IndexingConfig,

    /// Vector storage configuration
    pub vector_storage: VectorStorageConfig,

    /// Search configuration
    pub search: SearchConfig,

    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedding backend to use
    pub provider: EmbeddingProvider,

    /// Model configuration and specifications
    pub model: ModelConfig,

    /// Performance and resource configuration
    pub performance: PerformanceConfig,

    /// Cache configuration for model storage
    pub cache: CacheConfig,
}

/// Embedding provider type - defines how vectors are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EmbeddingProvider {
    /// Local transformer model run with Candle
    #[default]
    #[serde(rename = "local")]
    Local,

    /// Deterministic feature-hashing embedder; no model download
    #[serde(rename = "hashing")]
    Hashing,
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "hashing" => Ok(Self::Hashing),
            other => Err(ConfigError::InvalidValue {
                field: "embedding.provider".to_string(),
                value: other.to_string(),
                expected: "local, hashing".to_string(),
            }),
        }
    }
}

/// Model configuration and specifications
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `HuggingFace` model identifier
    pub id: String,

    /// Repository revision (branch, tag or commit)
    pub revision: String,

    /// Maximum tokens per input; longer inputs are truncated
    pub max_tokens: usize,

    /// Embedding dimensions produced by this model
    /// Must match vector storage configuration
    pub dimensions: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_EMBEDDING_MODEL_ID.to_string(),
            revision: DEFAULT_EMBEDDING_MODEL_REVISION.to_string(),
            max_tokens: DEFAULT_EMBEDDING_MODEL_MAX_TOKENS,
            dimensions: DEFAULT_EMBEDDING_MODEL_DIMENSIONS,
        }
    }
}

/// Performance and resource configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Texts per model forward pass during indexing
    pub indexer_batch_size: usize,

    /// Whether to use GPU acceleration if compiled in (Metal/CUDA)
    pub use_gpu: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            indexer_batch_size: DEFAULT_EMBEDDING_INDEXER_BATCH_SIZE,
            use_gpu: DEFAULT_EMBEDDING_USE_GPU,
        }
    }
}

/// Cache configuration for downloaded model files
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory for downloaded models
    pub dir: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: dirs::cache_dir().map(|d| d.join("gist").to_string_lossy().to_string()),
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overwrite fields whose `GIST_EMBEDDING_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(provider) = env_parse("GIST_EMBEDDING_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(id) = std::env::var("GIST_EMBEDDING_MODEL") {
            self.model.id = id;
        }
        if let Ok(revision) = std::env::var("GIST_EMBEDDING_MODEL_REVISION") {
            self.model.revision = revision;
        }
        if let Some(max_tokens) = env_parse("GIST_EMBEDDING_MAX_TOKENS") {
            self.model.max_tokens = max_tokens;
        }
        if let Some(dimensions) = env_parse("GIST_EMBEDDING_DIMENSION") {
            self.model.dimensions = dimensions;
        }
        if let Some(batch) = env_parse("GIST_EMBEDDING_INDEXER_BATCH_SIZE") {
            self.performance.indexer_batch_size = batch;
        }
        if let Some(use_gpu) = env_parse("GIST_EMBEDDING_USE_GPU") {
            self.performance.use_gpu = use_gpu;
        }
        if let Ok(dir) = std::env::var("GIST_EMBEDDING_CACHE_DIR") {
            self.cache.dir = Some(dir);
        }
    }

    /// Resolved cache directory, if any
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache.dir.as_ref().map(PathBuf::from)
    }
}

impl validation::Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.model.id, "embedding.model.id")?;
        validation::validate_non_empty(&self.model.revision, "embedding.model.revision")?;
        validation::validate_range(
            self.model.max_tokens as u64,
            1,
            8192,
            "embedding.model.max_tokens",
        )?;
        validation::validate_range(
            self.model.dimensions as u64,
            1,
            8192,
            "embedding.model.dimensions",
        )?;
        validation::validate_range(
            self.performance.indexer_batch_size as u64,
            1,
            4096,
            "embedding.performance.indexer_batch_size",
        )?;
        Ok(())
    }
}

/// Indexing run configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Wipe and recreate the collection at the start of every run
    pub full_rebuild: bool,

    /// Extract blocks from trees that contain syntax errors instead of failing the file
    pub tolerate_syntax_errors: bool,

    /// Directory names skipped during traversal
    pub excluded_dirs: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            full_rebuild: DEFAULT_INDEXING_FULL_REBUILD,
            tolerate_syntax_errors: DEFAULT_INDEXING_TOLERATE_SYNTAX_ERRORS,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl IndexingConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overwrite fields whose `GIST_INDEXING_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(full_rebuild) = env_parse("GIST_INDEXING_FULL_REBUILD") {
            self.full_rebuild = full_rebuild;
        }
        if let Some(tolerate) = env_parse("GIST_INDEXING_TOLERATE_SYNTAX_ERRORS") {
            self.tolerate_syntax_errors = tolerate;
        }
        // Comma-separated list replaces the defaults
        if let Ok(dirs) = std::env::var("GIST_INDEXING_EXCLUDED_DIRS") {
            self.excluded_dirs = dirs
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string)
                .collect();
        }
    }
}

impl validation::Validate for IndexingConfig {
    fn validate(&self) -> ConfigResult<()> {
        for dir in &self.excluded_dirs {
            validation::validate_non_empty(dir, "indexing.excluded_dirs")?;
        }
        Ok(())
    }
}

/// Local vector storage configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VectorStorageConfig {
    /// Index directory, relative to the indexed root
    pub index_dir: String,

    /// Database file name inside the index directory
    pub database_file: String,

    /// Collection name
    pub collection_name: String,

    /// Vector dimension (must match embedding model)
    pub vector_dimension: usize,
}

impl Default for VectorStorageConfig {
    fn default() -> Self {
        Self {
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            vector_dimension: DEFAULT_VECTOR_DIMENSION,
        }
    }
}

impl VectorStorageConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overwrite fields whose `GIST_VECTOR_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(index_dir) = std::env::var("GIST_VECTOR_INDEX_DIR") {
            self.index_dir = index_dir;
        }
        if let Ok(file) = std::env::var("GIST_VECTOR_DATABASE_FILE") {
            self.database_file = file;
        }
        if let Ok(collection) = std::env::var("GIST_VECTOR_COLLECTION_NAME") {
            self.collection_name = collection;
        }
        if let Some(dimension) = env_parse("GIST_VECTOR_DIMENSION") {
            self.vector_dimension = dimension;
        }
    }

    /// Index directory for a given indexed root
    pub fn index_path(&self, root: &Path) -> PathBuf {
        root.join(&self.index_dir)
    }

    /// Database file for a given indexed root
    pub fn database_path(&self, root: &Path) -> PathBuf {
        self.index_path(root).join(&self.database_file)
    }
}

impl validation::Validate for VectorStorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.index_dir, "vector_storage.index_dir")?;
        validation::validate_non_empty(&self.database_file, "vector_storage.database_file")?;
        validation::validate_non_empty(&self.collection_name, "vector_storage.collection_name")?;
        validation::validate_range(
            self.vector_dimension as u64,
            1,
            8192,
            "vector_storage.vector_dimension",
        )?;
        Ok(())
    }
}

/// Search configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when the caller does not specify a limit
    pub default_limit: usize,

    /// Upper bound on a single query, embedding included
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
            timeout_seconds: DEFAULT_SEARCH_TIMEOUT_SECONDS,
        }
    }
}

impl SearchConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overwrite fields whose `GIST_SEARCH_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(limit) = env_parse("GIST_SEARCH_DEFAULT_LIMIT") {
            self.default_limit = limit;
        }
        if let Some(timeout) = env_parse("GIST_SEARCH_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout;
        }
    }
}

impl validation::Validate for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.default_limit as u64, 1, 1000, "search.default_limit")?;
        validation::validate_range(self.timeout_seconds, 1, 3600, "search.timeout_seconds")?;
        Ok(())
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "telemetry.log_format".to_string(),
                value: other.to_string(),
                expected: "pretty, json".to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Tracing level (trace, debug, info, warn, error)
    pub tracing_level: String,

    /// Output format
    pub log_format: LogFormat,

    /// Directory for daily-rotated log files; stderr only when unset
    pub log_dir: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tracing_level: DEFAULT_TRACING_LEVEL.to_string(),
            log_format: LogFormat::default(),
            log_dir: None,
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overwrite fields whose `GIST_TELEMETRY_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("GIST_TELEMETRY_TRACING_LEVEL") {
            self.tracing_level = level;
        }
        if let Some(format) = env_parse("GIST_TELEMETRY_LOG_FORMAT") {
            self.log_format = format;
        }
        if let Ok(dir) = std::env::var("GIST_TELEMETRY_LOG_DIR") {
            self.log_dir = Some(dir);
        }
    }
}

impl validation::Validate for TelemetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_one_of(&self.tracing_level, TRACING_LEVELS, "telemetry.tracing_level")
    }
}

impl ApplicationConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply every `GIST_*` override that is set in the environment
    pub fn apply_env_overrides(&mut self) {
        self.embedding.apply_env_overrides();
        self.indexing.apply_env_overrides();
        self.vector_storage.apply_env_overrides();
        self.search.apply_env_overrides();
        self.telemetry.apply_env_overrides();
    }
}

impl validation::Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.embedding.validate()?;
        self.indexing.validate()?;
        self.vector_storage.validate()?;
        self.search.validate()?;
        self.telemetry.validate()?;

        // Cross-field validation: embedding and vector dimensions must match
        if self.embedding.model.dimensions != self.vector_storage.vector_dimension {
            return Err(ConfigError::Generic {
                message: format!(
                    "Embedding dimension ({}) must match vector storage dimension ({})",
                    self.embedding.model.dimensions, self.vector_storage.vector_dimension
                ),
            });
        }

        Ok(())
    }
}
