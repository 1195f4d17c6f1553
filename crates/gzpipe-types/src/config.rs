//! Configuration types for gzpipe
//!
//! This module provides type-safe compression settings with validation and
//! optional serialization support. Every value here is passed through to the
//! DEFLATE engine unmodified; validation only rejects values the engine would
//! refuse anyway.

/// Compression level with validation
///
/// `-1` selects the engine's default level, `0` stores without compression and
/// `1..=9` trade speed for ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i32", into = "i32"))]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    /// Engine default level
    pub const DEFAULT: i32 = -1;
    /// No compression
    pub const NONE: i32 = 0;
    /// Fastest compression
    pub const FASTEST: i32 = 1;
    /// Best compression
    pub const BEST: i32 = 9;

    /// Create a new compression level with validation
    pub fn new(level: i32) -> Result<Self, String> {
        if level < Self::DEFAULT || level > Self::BEST {
            Err(format!(
                "Compression level {} must be between {} and {}",
                level,
                Self::DEFAULT,
                Self::BEST
            ))
        } else {
            Ok(Self(level))
        }
    }

    /// Get the compression level value
    pub fn get(self) -> i32 {
        self.0
    }

    /// Check if this is the engine default level
    pub fn is_default(self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<i32> for CompressionLevel {
    type Error = String;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<CompressionLevel> for i32 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

/// DEFLATE matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompressionStrategy {
    /// Normal data
    #[default]
    Default,
    /// Data produced by a filter or predictor
    Filtered,
    /// Huffman encoding only, no string matching
    HuffmanOnly,
    /// Match distances limited to one (run-length encoding)
    Rle,
    /// Fixed Huffman codes only
    Fixed,
}

impl CompressionStrategy {
    /// All strategies, in engine code order
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Filtered,
        Self::HuffmanOnly,
        Self::Rle,
        Self::Fixed,
    ];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Filtered => "filtered",
            Self::HuffmanOnly => "huffman_only",
            Self::Rle => "rle",
            Self::Fixed => "fixed",
        }
    }
}

/// Flush mode requested from the engine on every write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlushMode {
    /// Let the engine decide when to emit output
    None,
    /// Emit all complete output after each write
    #[default]
    Partial,
    /// Emit all output and align to a byte boundary after each write
    Sync,
}

/// Size of the scratch buffer compressed output is drained through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct ScratchSize(usize);

impl ScratchSize {
    /// Minimum scratch size (64 bytes)
    pub const MIN: usize = 64;
    /// Maximum scratch size (1MB)
    pub const MAX: usize = 1024 * 1024;
    /// Default scratch size (4KB)
    pub const DEFAULT: usize = 4 * 1024;

    /// Create a new scratch size with validation
    pub fn new(size: usize) -> Result<Self, String> {
        if size < Self::MIN {
            Err(format!("Scratch size {} is below minimum {}", size, Self::MIN))
        } else if size > Self::MAX {
            Err(format!("Scratch size {} exceeds maximum {}", size, Self::MAX))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the scratch size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ScratchSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for ScratchSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<ScratchSize> for usize {
    fn from(size: ScratchSize) -> Self {
        size.0
    }
}

/// Settings for one compression stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompressionConfig {
    /// Compression level
    pub level: CompressionLevel,
    /// Matching strategy
    pub strategy: CompressionStrategy,
    /// Flush mode used by every write
    pub flush_mode: FlushMode,
    /// Scratch buffer size
    pub scratch_size: ScratchSize,
}

impl CompressionConfig {
    /// Create a configuration with engine defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression level
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the matching strategy
    pub fn with_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the per-write flush mode
    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    /// Set the scratch buffer size
    pub fn with_scratch_size(mut self, scratch_size: ScratchSize) -> Self {
        self.scratch_size = scratch_size;
        self
    }
}
