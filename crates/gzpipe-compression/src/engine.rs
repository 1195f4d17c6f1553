//! One-shot compression helpers

use gzpipe_alloc::HostAllocator;
use gzpipe_types::{CompressionConfig, Result, GZIP_HEADER_LEN, GZIP_TRAILER_LEN};
use tracing::debug;

use crate::streaming::Compressor;

fn output_capacity(input_len: usize) -> usize {
    // Framing plus a stored-block overhead of 5 bytes per 16 KiB.
    input_len / 2 + (input_len >> 14) * 5 + GZIP_HEADER_LEN + GZIP_TRAILER_LEN + 64
}

/// Compress `data` into a complete gzip member held in memory
///
/// # Examples
///
/// ```rust
/// use gzpipe_compression::{compress_to_vec, GzipTrailer};
/// use gzpipe_types::CompressionConfig;
///
/// let gz = compress_to_vec(b"hello hello hello", &CompressionConfig::default())?;
/// assert_eq!(GzipTrailer::parse(&gz)?.isize, 17);
/// # Ok::<(), gzpipe_types::Error>(())
/// ```
pub fn compress_to_vec(data: &[u8], config: &CompressionConfig) -> Result<Vec<u8>> {
    let sink = Vec::with_capacity(output_capacity(data.len()));
    let mut compressor = Compressor::with_config(sink, config)?;
    compressor.compress(data)?;
    compressor.finish()?;
    debug!(
        "Compressed {} bytes to {} bytes in memory",
        data.len(),
        compressor.stats().bytes_out
    );
    Ok(compressor.into_inner())
}

/// Like [`compress_to_vec`], with engine memory served by `allocator`
pub fn compress_to_vec_with<A>(
    data: &[u8],
    config: &CompressionConfig,
    allocator: A,
) -> Result<Vec<u8>>
where
    A: HostAllocator + 'static,
{
    let sink = Vec::with_capacity(output_capacity(data.len()));
    let mut compressor = Compressor::with_allocator(sink, config, allocator)?;
    compressor.compress(data)?;
    compressor.finish()?;
    Ok(compressor.into_inner())
}
