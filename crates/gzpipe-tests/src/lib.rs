//! gzpipe Testing Suite
//!
//! This crate provides integration tests and performance benchmarks for the
//! gzpipe crates, plus the shared helpers they use.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// This module provides common utilities used across all test files
/// to ensure consistency and reduce code duplication.
pub mod test_utils;
