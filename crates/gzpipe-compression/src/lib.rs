//! Streaming gzip compression for gzpipe
//!
//! This crate wraps zlib's DEFLATE engine in a push-style compressor that
//! writes a gzip member (RFC 1952) into any [`std::io::Write`] sink:
//!
//! - **Streaming**: input of any length, drained through a bounded scratch buffer
//! - **Pluggable memory**: the engine's allocations can be routed through a
//!   [`HostAllocator`](gzpipe_alloc::HostAllocator) via the sized-allocation shim
//! - **Ordered teardown**: engine state is always released before the allocator it uses
//!
//! # Examples
//!
//! ```rust
//! use gzpipe_alloc::TrackingAllocator;
//! use gzpipe_compression::{Compressor, GzipTrailer};
//! use gzpipe_types::CompressionConfig;
//!
//! let tracker = TrackingAllocator::new();
//! let mut compressor =
//!     Compressor::with_allocator(Vec::new(), &CompressionConfig::default(), tracker.clone())?;
//!
//! compressor.compress(b"Hello, ")?;
//! compressor.compress(b"world!")?;
//! compressor.finish()?;
//!
//! let gz = compressor.into_inner();
//! assert_eq!(GzipTrailer::parse(&gz)?.isize, 13);
//! assert_eq!(tracker.snapshot().live_bytes, 0);
//! # Ok::<(), gzpipe_types::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
mod stream;
pub mod streaming;
pub mod trailer;

pub use engine::{compress_to_vec, compress_to_vec_with};
pub use stream::{engine_status, GZIP_WINDOW_BITS, MEMORY_LEVEL};
pub use streaming::Compressor;
pub use trailer::{crc32, GzipTrailer, GZIP_MAGIC};
