//! Unified test utilities for gzpipe benchmarks and tests
//!
//! This module provides common utilities used across all test files
//! to ensure consistency and reduce code duplication.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestDataPattern {
    /// All zeros - highly compressible
    Zeros,
    /// All ones - highly compressible
    Ones,
    /// Random data - incompressible
    Random,
    /// Mixed compressible/incompressible data
    Mixed,
    /// Realistic file pattern similar to actual files
    Realistic,
    /// Every 256-byte window holds each byte value exactly once
    Distinct,
}

impl TestDataPattern {
    /// Every pattern
    pub const ALL: [Self; 6] = [
        Self::Zeros,
        Self::Ones,
        Self::Random,
        Self::Mixed,
        Self::Realistic,
        Self::Distinct,
    ];

    /// Short name for benchmark ids
    pub fn name(self) -> &'static str {
        match self {
            Self::Zeros => "zeros",
            Self::Ones => "ones",
            Self::Random => "random",
            Self::Mixed => "mixed",
            Self::Realistic => "realistic",
            Self::Distinct => "distinct",
        }
    }
}

/// Generate test data with specified pattern
///
/// Output is deterministic so benchmarks and failures are reproducible.
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Ones => vec![0xFFu8; size],
        TestDataPattern::Random => {
            // xorshift64
            let mut state = 0x9E37_79B9_7F4A_7C15u64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 24) as u8
                })
                .collect()
        }
        TestDataPattern::Mixed => (0..size)
            .map(|i| match i % 1000 {
                0..=99 => 0,
                100..=199 => 255,
                _ => (i % 256) as u8,
            })
            .collect(),
        TestDataPattern::Realistic => {
            const WORDS: [&str; 8] = [
                "stream ", "deflate ", "gzip ", "member ", "trailer ", "window ", "block ", "\n",
            ];
            let mut data = Vec::with_capacity(size);
            let mut i = 0usize;
            while data.len() < size {
                data.extend_from_slice(WORDS[(i * 7 + i / 3) % WORDS.len()].as_bytes());
                i += 1;
            }
            data.truncate(size);
            data
        }
        TestDataPattern::Distinct => (0..size).map(|i| (i % 256) as u8).collect(),
    }
}

/// Create a temporary file with test data
pub fn create_test_file(
    temp_dir: &TempDir,
    name: &str,
    size: usize,
    pattern: TestDataPattern,
) -> PathBuf {
    let file_path = temp_dir.path().join(name);
    let data = generate_test_data(size, pattern);
    fs::write(&file_path, data).expect("Failed to write test file");
    file_path
}

/// Decode a (possibly multi-member) gzip stream
pub fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .expect("Failed to decode gzip stream");
    out
}

/// Decode exactly the first gzip member
pub fn gunzip_member(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .expect("Failed to decode gzip member");
    out
}

/// Common input sizes for benchmarks
pub struct CommonFileSizes;

impl CommonFileSizes {
    /// 1KB
    pub const TINY: usize = 1024;
    /// 4KB
    pub const SMALL: usize = 4 * 1024;
    /// 64KB
    pub const MEDIUM: usize = 64 * 1024;
    /// 1MB
    pub const LARGE: usize = 1024 * 1024;
    /// 8MB
    pub const XLARGE: usize = 8 * 1024 * 1024;

    /// Get sizes suitable for micro-benchmarks
    pub fn micro() -> Vec<(&'static str, usize)> {
        vec![
            ("1KB", Self::TINY),
            ("4KB", Self::SMALL),
            ("64KB", Self::MEDIUM),
            ("1MB", Self::LARGE),
        ]
    }
}

/// Sink that records every write call it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Length of each write call, in order
    pub writes: Vec<usize>,
    /// Concatenated bytes written
    pub data: Vec<u8>,
    /// Number of flush calls
    pub flushes: usize,
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.push(buf.len());
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink that fails its Nth write call (1-based) and counts every call
#[derive(Debug)]
pub struct FailingSink {
    /// Write calls received so far, including the failing one
    pub calls: usize,
    /// Call number that fails
    pub fail_on: usize,
    /// Bytes accepted before the failure
    pub accepted: Vec<u8>,
}

impl FailingSink {
    /// Fail on the `fail_on`-th write call
    pub fn new(fail_on: usize) -> Self {
        Self {
            calls: 0,
            fail_on,
            accepted: Vec::new(),
        }
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        if self.calls == self.fail_on {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        self.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
