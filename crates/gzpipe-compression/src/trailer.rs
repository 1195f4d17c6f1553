//! Gzip member framing checks
//!
//! Reads the fixed header magic and the CRC32/ISIZE trailer of a finished
//! member without decompressing it.

use std::ffi::c_uint;

use gzpipe_types::{Error, Result, GZIP_HEADER_LEN, GZIP_TRAILER_LEN};
use libz_sys as zlib;

/// Gzip magic bytes followed by the DEFLATE method byte
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// CRC-32 of `data`, as the engine computes it for the trailer
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0;
    for chunk in data.chunks(c_uint::MAX as usize) {
        // SAFETY: `chunk` is valid for `chunk.len()` bytes, which fits in a c_uint.
        crc = unsafe { zlib::crc32(crc, chunk.as_ptr(), chunk.len() as c_uint) };
    }
    crc as u32
}

/// The 8-byte trailer closing a gzip member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data
    pub crc32: u32,
    /// Uncompressed length modulo 2^32
    pub isize: u32,
}

impl GzipTrailer {
    /// Parse the trailer of a complete single-member gzip stream.
    pub fn parse(member: &[u8]) -> Result<Self> {
        if member.len() < GZIP_HEADER_LEN + GZIP_TRAILER_LEN {
            return Err(Error::other(format!(
                "gzip member too short: {} bytes",
                member.len()
            )));
        }
        if member[..GZIP_MAGIC.len()] != GZIP_MAGIC {
            return Err(Error::other("missing gzip magic"));
        }

        let tail = &member[member.len() - GZIP_TRAILER_LEN..];
        Ok(Self {
            crc32: u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]),
            isize: u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }

    /// Trailer the engine should write for `data`
    pub fn expected_for(data: &[u8]) -> Self {
        Self {
            crc32: crc32(data),
            isize: data.len() as u32,
        }
    }
}
