//! Streaming gzip compression
//!
//! This module provides [`Compressor`], a push-style gzip encoder. Callers
//! hand it input slices of any length; compressed bytes are drained through a
//! bounded scratch buffer into the destination sink as they are produced, so
//! memory use does not grow with the input.

use std::fmt;
use std::io::{self, Write};

use gzpipe_alloc::{HostAllocator, PinnedAllocator};
use gzpipe_types::{CompressionConfig, CompressionStats, Result};
use libz_sys as zlib;
use tracing::{debug, trace};

use crate::stream::{self, DeflateStream, MAX_ENGINE_INPUT};

/// Streaming gzip compressor writing into `W`
///
/// The compressor moves through three states: created, writing (any number
/// of [`compress`](Self::compress) calls) and finished (after
/// [`finish`](Self::finish)). Calling `compress` after `finish` is not
/// supported; the engine rejects it with a stream error.
///
/// Dropping the compressor ends the engine stream and then releases its
/// allocator. It does not finish the stream: a dropped, unfinished
/// compressor leaves a truncated member in the sink.
///
/// # Examples
///
/// ```rust
/// use gzpipe_compression::Compressor;
///
/// let mut compressor = Compressor::new(Vec::new())?;
/// compressor.compress(b"blarg")?;
/// compressor.finish()?;
///
/// let gz = compressor.into_inner();
/// assert_eq!(&gz[..3], &[0x1f, 0x8b, 0x08]);
/// # Ok::<(), gzpipe_types::Error>(())
/// ```
pub struct Compressor<W: Write> {
    stream: DeflateStream,
    scratch: Box<[u8]>,
    sink: W,
    config: CompressionConfig,
    stats: CompressionStats,
}

impl<W: Write> Compressor<W> {
    /// Create a compressor with default settings and the engine's own allocator
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(sink, &CompressionConfig::default())
    }

    /// Create a compressor with explicit settings and the engine's own allocator
    pub fn with_config(sink: W, config: &CompressionConfig) -> Result<Self> {
        let stream = DeflateStream::new(config, None)?;
        Ok(Self::from_stream(stream, sink, config))
    }

    /// Create a compressor whose engine allocates through `allocator`
    ///
    /// The allocator is moved to the heap and outlives the engine state. If
    /// initialization fails it is released before this returns.
    pub fn with_allocator<A>(sink: W, config: &CompressionConfig, allocator: A) -> Result<Self>
    where
        A: HostAllocator + 'static,
    {
        let stream = DeflateStream::new(config, Some(PinnedAllocator::new(allocator)))?;
        Ok(Self::from_stream(stream, sink, config))
    }

    fn from_stream(stream: DeflateStream, sink: W, config: &CompressionConfig) -> Self {
        Self {
            stream,
            scratch: vec![0u8; config.scratch_size.get()].into_boxed_slice(),
            sink,
            config: *config,
            stats: CompressionStats::new(),
        }
    }

    /// Compress `input` and hand the produced bytes to the sink
    ///
    /// Returns the number of bytes consumed, which is always `input.len()`.
    /// An empty slice is accepted and does not touch the engine.
    pub fn compress(&mut self, input: &[u8]) -> Result<usize> {
        if input.is_empty() {
            return Ok(0);
        }

        let flush = stream::flush_code(self.config.flush_mode);
        for chunk in input.chunks(MAX_ENGINE_INPUT) {
            let mut pending = chunk;
            loop {
                let step = self.stream.deflate(pending, &mut self.scratch, flush)?;
                pending = &pending[step.consumed..];
                self.drain(step.produced)?;

                // A partially filled scratch buffer means the engine has no
                // more output for this input.
                if step.produced < self.scratch.len() {
                    break;
                }
            }
            debug_assert!(pending.is_empty());
        }

        self.stats.bytes_in += input.len() as u64;
        Ok(input.len())
    }

    /// Finalize the gzip member
    ///
    /// Flushes all buffered data and writes the CRC32/ISIZE trailer to the
    /// sink. Calling `finish` again is harmless and produces no output.
    pub fn finish(&mut self) -> Result<()> {
        loop {
            let step = self.stream.deflate(&[], &mut self.scratch, zlib::Z_FINISH)?;
            self.drain(step.produced)?;
            if step.stream_end {
                break;
            }
        }

        debug!(
            bytes_in = self.stats.bytes_in,
            bytes_out = self.stats.bytes_out,
            allocator = self.stream.allocator_name(),
            "gzip stream finished"
        );
        Ok(())
    }

    fn drain(&mut self, produced: usize) -> Result<()> {
        if produced == 0 {
            return Ok(());
        }
        self.sink.write_all(&self.scratch[..produced])?;
        self.stats.bytes_out += produced as u64;
        self.stats.sink_writes += 1;
        trace!(produced, "drained scratch buffer");
        Ok(())
    }

    /// Counters for this stream so far
    pub fn stats(&self) -> CompressionStats {
        self.stats
    }

    /// Settings the stream was created with
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Reference to the sink
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Mutable reference to the sink
    ///
    /// Writing to the sink directly interleaves with compressed output.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Tear down the engine and return the sink
    ///
    /// Does not finish the stream.
    pub fn into_inner(self) -> W {
        let Self { stream, sink, .. } = self;
        drop(stream);
        sink
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.compress(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<W: Write> fmt::Debug for Compressor<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("allocator", &self.stream.allocator_name())
            .finish_non_exhaustive()
    }
}
