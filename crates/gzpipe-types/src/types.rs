//! Core data types for gzpipe
//!
//! Counters describing a finished or in-flight compression stream.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of the gzip member header the engine writes (no optional fields)
pub const GZIP_HEADER_LEN: usize = 10;

/// Size of the gzip member trailer (CRC32 + ISIZE)
pub const GZIP_TRAILER_LEN: usize = 8;

/// Statistics for one compression stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionStats {
    /// Uncompressed bytes consumed by the engine
    pub bytes_in: u64,
    /// Compressed bytes handed to the sink
    pub bytes_out: u64,
    /// Number of write calls made on the sink
    pub sink_writes: u64,
}

impl CompressionStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Compressed size as a fraction of the input size
    ///
    /// Returns `0.0` when nothing has been consumed yet.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_in > 0 {
            self.bytes_out as f64 / self.bytes_in as f64
        } else {
            0.0
        }
    }

    /// Bytes saved relative to the input, saturating at zero
    pub fn space_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    /// Merge statistics from another instance
    pub fn merge(&mut self, other: &CompressionStats) {
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
        self.sink_writes += other.sink_writes;
    }
}
