//! Configuration builder for layered configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Smallest accepted `memory.limit_bytes`
pub const MIN_MEMORY_LIMIT: u64 = 64 * 1024;

/// Configuration builder for loading configuration from multiple sources
///
/// Sources apply in the order they were added, on top of the defaults.
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Defaults,
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add default configuration values
    pub fn add_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Add a configuration file source; missing files are skipped
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add a configuration file source with explicit format
    pub fn add_source_file_with_format<P: AsRef<Path>>(
        mut self,
        path: P,
        format: FileFormat,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        // Defaults are always the base layer
        let defaults_value = serde_yaml::to_value(Config::default())
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        debug!("Loading configuration from {}", path.display());
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .separator(&self.env_separator)
                            .try_parsing(true),
                    );
                }
                ConfigSource::Defaults => {}
            }
        }

        let config = self.inner.build()?;
        let result: Config = config.try_deserialize()?;

        Self::validate(&result)?;

        Ok(result)
    }

    /// Try to build the configuration, returning defaults on error
    pub fn build_or_default(self) -> Config {
        self.build().unwrap_or_default()
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Validate the configuration
    pub fn validate(config: &Config) -> ConfigResult<()> {
        if let Some(limit) = config.memory.limit_bytes {
            if !config.memory.allocator.uses_shim() {
                return Err(ConfigError::validation(
                    "A memory limit requires the 'global' or 'tracking' allocator",
                ));
            }
            if limit < MIN_MEMORY_LIMIT {
                return Err(ConfigError::validation(format!(
                    "Memory limit must be at least {} bytes",
                    MIN_MEMORY_LIMIT
                )));
            }
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AllocatorKind;
    use gzpipe_types::{CompressionStrategy, FlushMode};
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().add_defaults().build().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder_yaml_file() {
        let mut temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
compression:
  level: 9
  strategy: rle
  flush_mode: sync
memory:
  allocator: tracking
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.compression.level.get(), 9);
        assert_eq!(config.compression.strategy, CompressionStrategy::Rle);
        assert_eq!(config.compression.flush_mode, FlushMode::Sync);
        assert_eq!(config.memory.allocator, AllocatorKind::Tracking);
        assert_eq!(config.compression.scratch_size.get(), 4096);
    }

    #[test]
    fn test_builder_toml_file() {
        let mut temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
[memory]
allocator = "global"
limit_bytes = 1048576
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.memory.allocator, AllocatorKind::Global);
        assert_eq!(config.memory.limit_bytes, Some(1_048_576));
    }

    #[test]
    fn test_builder_missing_file_is_skipped() {
        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file("/nonexistent/gzpipe.yaml")
            .build()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder_rejects_out_of_range_level() {
        let mut temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(temp_file, "compression:\n  level: 12").unwrap();

        let result = ConfigBuilder::new()
            .add_source_file(temp_file.path())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_limit_requires_shim() {
        let mut config = Config::default();
        config.memory.limit_bytes = Some(1 << 20);
        let err = ConfigBuilder::validate(&config).unwrap_err();
        assert!(err.to_string().contains("requires"));

        config.memory.allocator = AllocatorKind::Global;
        assert!(ConfigBuilder::validate(&config).is_ok());

        config.memory.limit_bytes = Some(16);
        assert!(ConfigBuilder::validate(&config).is_err());
    }

    #[test]
    fn test_validation_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        let err = ConfigBuilder::validate(&config).unwrap_err();
        assert!(err.to_string().contains("Log level"));
    }

    #[test]
    fn test_env_overrides_file() {
        // Prefix is unique to this test so parallel tests are unaffected.
        std::env::set_var("GZPIPE_ENV_TEST__COMPRESSION__LEVEL", "1");
        std::env::set_var("GZPIPE_ENV_TEST__MEMORY__ALLOCATOR", "global");

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_env_prefix("GZPIPE_ENV_TEST")
            .build();

        std::env::remove_var("GZPIPE_ENV_TEST__COMPRESSION__LEVEL");
        std::env::remove_var("GZPIPE_ENV_TEST__MEMORY__ALLOCATOR");

        let config = config.unwrap();
        assert_eq!(config.compression.level.get(), 1);
        assert_eq!(config.memory.allocator, AllocatorKind::Global);
    }
}
