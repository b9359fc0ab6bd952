//! Configuration source loading and composition

use crate::validation::Validate;
use crate::{ApplicationConfig, ConfigResult};
use std::path::{Path, PathBuf};

/// A layer that contributes to the final configuration
pub trait ConfigurationSource {
    /// Apply this source on top of `config`
    ///
    /// # Errors
    /// Returns configuration loading errors
    fn apply(&self, config: ApplicationConfig) -> ConfigResult<ApplicationConfig>;

    /// Get the name of this configuration source
    fn name(&self) -> &str;

    /// Get the priority of this source (higher number = higher priority)
    fn priority(&self) -> u8;
}

/// Environment variable overrides (`GIST_*`)
pub struct EnvironmentSource;

impl ConfigurationSource for EnvironmentSource {
    fn apply(&self, mut config: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        config.apply_env_overrides();
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "environment"
    }

    fn priority(&self) -> u8 {
        100 // Environment variables override everything
    }
}

/// TOML file; missing keys fall back to defaults
pub struct TomlFileSource {
    path: PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn apply(&self, _config: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        // Every section is `#[serde(default)]`, so the parsed file is already
        // a complete config with defaults for anything it leaves out.
        let config: ApplicationConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }

    fn priority(&self) -> u8 {
        50 // Below env vars, above defaults
    }
}

type ConfigSources = Vec<Box<dyn ConfigurationSource>>;

/// Configuration loader that combines multiple sources
pub struct ConfigurationLoader {
    sources: ConfigSources,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Standard stack: optional TOML file, then environment overrides
    pub fn standard(config_file: Option<&Path>) -> Self {
        let mut loader = Self::new();
        if let Some(path) = config_file {
            loader = loader.add_source(Box::new(TomlFileSource::new(path)));
        }
        loader.add_source(Box::new(EnvironmentSource))
    }

    /// Apply all sources over the defaults, lowest priority first, then validate
    ///
    /// # Errors
    /// Returns configuration loading or validation errors
    pub fn load(&self) -> ConfigResult<ApplicationConfig> {
        let mut config = ApplicationConfig::default();

        let mut sorted_sources = self.sources.iter().collect::<Vec<_>>();
        sorted_sources.sort_by_key(|source| source.priority());

        for source in sorted_sources {
            config = source.apply(config)?;
            tracing::debug!("Applied configuration source: {}", source.name());
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, EmbeddingProvider};
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_toml_source_loading() {
        let file = write_toml(
            r#"
            [embedding]
            provider = "hashing"

            [vector_storage]
            collection_name = "from_file"
            "#,
        );

        let config = ConfigurationLoader::new()
            .add_source(Box::new(TomlFileSource::new(file.path())))
            .load()
            .unwrap();

        assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(config.vector_storage.collection_name, "from_file");
        assert_eq!(config.search.default_limit, crate::DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigurationLoader::new()
            .add_source(Box::new(TomlFileSource::new("/definitely/not/here.toml")))
            .load();
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let file = write_toml("[search\ndefault_limit = ");
        let result = ConfigurationLoader::new()
            .add_source(Box::new(TomlFileSource::new(file.path())))
            .load();
        assert!(matches!(result, Err(ConfigError::TomlParsing(_))));
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let file = write_toml(
            r"
            [vector_storage]
            vector_dimension = 768
            ",
        );
        let result = ConfigurationLoader::new()
            .add_source(Box::new(TomlFileSource::new(file.path())))
            .load();
        assert!(result.is_err(), "dimension mismatch must be rejected");
    }
}
