//! Core type system and error handling for gzpipe
//!
//! This crate provides the foundational types shared by the gzpipe crates:
//!
//! - **Error handling**: the engine status taxonomy, sink errors and their classification
//! - **Configuration**: validated compression level, strategy, flush mode and scratch size
//! - **Statistics**: byte counters for a compression stream
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use gzpipe_types::{CompressionConfig, CompressionLevel, CompressionStrategy, Result};
//!
//! fn best_rle() -> Result<CompressionConfig> {
//!     let level = CompressionLevel::new(9).map_err(gzpipe_types::Error::config)?;
//!     Ok(CompressionConfig::new()
//!         .with_level(level)
//!         .with_strategy(CompressionStrategy::Rle))
//! }
//! # assert_eq!(best_rle().unwrap().level.get(), 9);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{CompressionConfig, CompressionLevel, CompressionStrategy, FlushMode, ScratchSize};
pub use error::{EngineStatus, Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = CompressionStats::new();
        assert_eq!(stats.bytes_in, 0);
        assert_eq!(stats.bytes_out, 0);
        assert_eq!(stats.compression_ratio(), 0.0);
    }

    #[test]
    fn test_stats_ratio_and_savings() {
        let stats = CompressionStats {
            bytes_in: 1000,
            bytes_out: 250,
            sink_writes: 3,
        };
        assert!((stats.compression_ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(stats.space_saved(), 750);

        let expanded = CompressionStats {
            bytes_in: 5,
            bytes_out: 25,
            sink_writes: 1,
        };
        assert_eq!(expanded.space_saved(), 0);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = CompressionStats {
            bytes_in: 10,
            bytes_out: 4,
            sink_writes: 1,
        };
        total.merge(&CompressionStats {
            bytes_in: 20,
            bytes_out: 6,
            sink_writes: 2,
        });
        assert_eq!(total.bytes_in, 30);
        assert_eq!(total.bytes_out, 10);
        assert_eq!(total.sink_writes, 3);
    }
}
