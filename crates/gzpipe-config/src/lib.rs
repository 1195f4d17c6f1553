//! Configuration management for gzpipe
//!
//! This crate loads the settings the `gzpipe` tool runs with: compression
//! parameters passed through to the engine, the allocator serving the
//! engine's memory, and logging.
//!
//! # Features
//!
//! - **Multiple formats**: YAML, TOML and JSON configuration files
//! - **Validation**: reject combinations the compressor cannot honor
//! - **Environment overrides**: `GZPIPE__<SECTION>__<KEY>` variables
//! - **Defaults**: every field has a default, so partial files are fine
//!
//! # Examples
//!
//! ```rust
//! use gzpipe_config::{AllocatorKind, ConfigBuilder};
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("gzpipe.yaml")
//!     .add_env_prefix("GZPIPE")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Scratch size: {}", config.compression.scratch_size.get());
//! assert_eq!(config.memory.allocator, AllocatorKind::Engine);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use gzpipe_types::CompressionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ENV_PREFIX};

/// Main configuration structure for gzpipe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compression parameters
    pub compression: CompressionConfig,
    /// Engine memory configuration
    pub memory: MemoryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Allocator serving the compression engine's internal buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorKind {
    /// The engine's own allocator (C heap)
    #[default]
    Engine,
    /// Rust's global allocator through the sized-allocation shim
    Global,
    /// Global allocator with allocation counters
    Tracking,
}

impl AllocatorKind {
    /// Every allocator kind
    pub const ALL: [Self; 3] = [Self::Engine, Self::Global, Self::Tracking];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Global => "global",
            Self::Tracking => "tracking",
        }
    }

    /// Whether engine memory goes through the shim
    pub fn uses_shim(self) -> bool {
        !matches!(self, Self::Engine)
    }
}

impl fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AllocatorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ConfigError::invalid_value("memory.allocator", &format!("unknown allocator '{s}'"))
            })
    }
}

/// Engine memory configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Allocator the engine uses
    pub allocator: AllocatorKind,
    /// Byte budget for engine allocations; requires a shim allocator
    pub limit_bytes: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.memory.allocator, AllocatorKind::Engine);
        assert_eq!(config.memory.limit_bytes, None);
        assert_eq!(config.logging.level, "warn");
        assert!(config.compression.level.is_default());
    }

    #[rstest]
    #[case("engine", AllocatorKind::Engine)]
    #[case("Global", AllocatorKind::Global)]
    #[case("TRACKING", AllocatorKind::Tracking)]
    fn test_allocator_kind_parse(#[case] input: &str, #[case] expected: AllocatorKind) {
        assert_eq!(input.parse::<AllocatorKind>().unwrap(), expected);
        assert_eq!(expected.to_string(), expected.name());
    }

    #[test]
    fn test_allocator_kind_rejects_unknown() {
        let err = "jemalloc".parse::<AllocatorKind>().unwrap_err();
        assert!(err.to_string().contains("jemalloc"));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = Config::default();
        config.memory.allocator = AllocatorKind::Tracking;
        config.memory.limit_bytes = Some(1 << 20);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"tracking\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
