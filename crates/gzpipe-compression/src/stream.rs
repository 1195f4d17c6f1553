//! Raw DEFLATE stream over zlib
//!
//! [`DeflateStream`] owns the engine's `z_stream` and, when a host allocator
//! was requested, the [`PinnedAllocator`] its callbacks point into. All
//! unsafe engine calls in the crate go through this module.

use std::ffi::{c_int, c_uint, c_void, CStr};
use std::mem;
use std::ptr;

use gzpipe_alloc::PinnedAllocator;
use gzpipe_types::{CompressionConfig, CompressionStrategy, EngineStatus, Error, FlushMode, Result};
use libz_sys as zlib;
use tracing::{debug, trace};

/// Window bits selecting a 32 KiB window with gzip framing (15 + 16)
pub const GZIP_WINDOW_BITS: c_int = 15 + 16;

/// Engine memory level
pub const MEMORY_LEVEL: c_int = 8;

/// Largest input the engine accepts in one call
pub(crate) const MAX_ENGINE_INPUT: usize = c_uint::MAX as usize;

/// Outcome of one engine call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    /// Input bytes consumed
    pub consumed: usize,
    /// Output bytes produced
    pub produced: usize,
    /// The engine reported the end of the stream
    pub stream_end: bool,
}

/// Map an engine return code to its status
pub fn engine_status(code: c_int) -> EngineStatus {
    match code {
        zlib::Z_STREAM_END => EngineStatus::StreamEnd,
        zlib::Z_NEED_DICT => EngineStatus::NeedDictionary,
        zlib::Z_ERRNO => EngineStatus::Errno,
        zlib::Z_STREAM_ERROR => EngineStatus::StreamError,
        zlib::Z_DATA_ERROR => EngineStatus::DataError,
        zlib::Z_MEM_ERROR => EngineStatus::MemoryError,
        zlib::Z_BUF_ERROR => EngineStatus::BufferError,
        zlib::Z_VERSION_ERROR => EngineStatus::VersionError,
        other => EngineStatus::Unknown(other),
    }
}

pub(crate) fn strategy_code(strategy: CompressionStrategy) -> c_int {
    match strategy {
        CompressionStrategy::Default => zlib::Z_DEFAULT_STRATEGY,
        CompressionStrategy::Filtered => zlib::Z_FILTERED,
        CompressionStrategy::HuffmanOnly => zlib::Z_HUFFMAN_ONLY,
        CompressionStrategy::Rle => zlib::Z_RLE,
        CompressionStrategy::Fixed => zlib::Z_FIXED,
    }
}

pub(crate) fn flush_code(mode: FlushMode) -> c_int {
    match mode {
        FlushMode::None => zlib::Z_NO_FLUSH,
        FlushMode::Partial => zlib::Z_PARTIAL_FLUSH,
        FlushMode::Sync => zlib::Z_SYNC_FLUSH,
    }
}

/// Forward to the C heap, as the engine does when left to itself
unsafe extern "C" fn engine_alloc(_opaque: *mut c_void, items: c_uint, size: c_uint) -> *mut c_void {
    match (items as usize).checked_mul(size as usize) {
        Some(bytes) => libc::malloc(bytes),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn engine_free(_opaque: *mut c_void, address: *mut c_void) {
    libc::free(address);
}

fn engine_error(code: c_int, msg: *const std::ffi::c_char) -> Error {
    let message = if msg.is_null() {
        None
    } else {
        // SAFETY: the engine only stores pointers to static NUL-terminated strings.
        Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
    };
    Error::Engine {
        status: engine_status(code),
        message,
    }
}

/// An initialized DEFLATE stream producing one gzip member
///
/// The `z_stream` is boxed because the engine's internal state keeps a
/// pointer back to it. Dropping the stream ends the engine first and only
/// then releases the pinned allocator its callbacks use.
pub(crate) struct DeflateStream {
    raw: Box<zlib::z_stream>,
    allocator: Option<PinnedAllocator>,
}

impl DeflateStream {
    /// Initialize a gzip stream, routing engine allocations through
    /// `allocator` when one is given.
    pub fn new(config: &CompressionConfig, allocator: Option<PinnedAllocator>) -> Result<Self> {
        let (zalloc, zfree, opaque) = match &allocator {
            Some(pinned) => (pinned.alloc_fn(), pinned.free_fn(), pinned.opaque()),
            None => (
                engine_alloc as gzpipe_alloc::AllocFn,
                engine_free as gzpipe_alloc::FreeFn,
                ptr::null_mut(),
            ),
        };

        let mut raw = Box::new(zlib::z_stream {
            next_in: ptr::null_mut(),
            avail_in: 0,
            total_in: 0,
            next_out: ptr::null_mut(),
            avail_out: 0,
            total_out: 0,
            msg: ptr::null_mut(),
            state: ptr::null_mut(),
            zalloc,
            zfree,
            opaque,
            data_type: 0,
            adler: 0,
            reserved: 0,
        });

        let level = config.level.get();
        let strategy = strategy_code(config.strategy);
        // SAFETY: `raw` is a zeroed stream with valid callbacks; the version
        // string and struct size describe the linked engine.
        let code = unsafe {
            zlib::deflateInit2_(
                &mut *raw,
                level,
                zlib::Z_DEFLATED,
                GZIP_WINDOW_BITS,
                MEMORY_LEVEL,
                strategy,
                zlib::zlibVersion(),
                mem::size_of::<zlib::z_stream>() as c_int,
            )
        };

        if code != zlib::Z_OK {
            let error = engine_error(code, raw.msg);
            debug!("deflate initialization failed: {}", error);
            // The engine releases its own partial state on failure; the
            // pinned allocator is dropped with `allocator` on return.
            return Err(error);
        }

        debug!(
            level,
            strategy = config.strategy.name(),
            allocator = allocator.as_ref().map_or("engine", PinnedAllocator::type_name),
            "deflate stream initialized"
        );
        Ok(Self { raw, allocator })
    }

    /// Run the engine once over `input`, writing into `output`.
    ///
    /// `input` must not exceed [`MAX_ENGINE_INPUT`] bytes. `Z_OK` and
    /// `Z_STREAM_END` are successes; every other code is an error.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: c_int) -> Result<Step> {
        debug_assert!(input.len() <= MAX_ENGINE_INPUT);
        debug_assert!(output.len() <= MAX_ENGINE_INPUT);

        let raw = &mut *self.raw;
        // The engine never writes through `next_in`.
        raw.next_in = input.as_ptr().cast_mut();
        raw.avail_in = input.len() as c_uint;
        raw.next_out = output.as_mut_ptr();
        raw.avail_out = output.len() as c_uint;

        // SAFETY: the stream was initialized in `new`, and both buffers are
        // valid for the lengths just stored.
        let code = unsafe { zlib::deflate(raw, flush) };

        let step = Step {
            consumed: input.len() - raw.avail_in as usize,
            produced: output.len() - raw.avail_out as usize,
            stream_end: code == zlib::Z_STREAM_END,
        };
        raw.next_in = ptr::null_mut();
        raw.avail_in = 0;
        raw.next_out = ptr::null_mut();
        raw.avail_out = 0;

        match code {
            zlib::Z_OK | zlib::Z_STREAM_END => Ok(step),
            _ => Err(engine_error(code, raw.msg)),
        }
    }

    /// Name of the allocator serving the engine
    pub fn allocator_name(&self) -> &'static str {
        self.allocator
            .as_ref()
            .map_or("engine", PinnedAllocator::type_name)
    }
}

impl Drop for DeflateStream {
    fn drop(&mut self) {
        // SAFETY: the stream was initialized in `new` and is ended once here.
        // Its callbacks may still reach the pinned allocator, which stays
        // alive until after this call.
        let code = unsafe { zlib::deflateEnd(&mut *self.raw) };
        trace!(status = code, "deflate stream ended");
        drop(self.allocator.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gzpipe_alloc::{LimitedAllocator, TrackingAllocator};
    use rstest::rstest;

    #[rstest]
    #[case(zlib::Z_STREAM_END, EngineStatus::StreamEnd)]
    #[case(zlib::Z_NEED_DICT, EngineStatus::NeedDictionary)]
    #[case(zlib::Z_ERRNO, EngineStatus::Errno)]
    #[case(zlib::Z_STREAM_ERROR, EngineStatus::StreamError)]
    #[case(zlib::Z_DATA_ERROR, EngineStatus::DataError)]
    #[case(zlib::Z_MEM_ERROR, EngineStatus::MemoryError)]
    #[case(zlib::Z_BUF_ERROR, EngineStatus::BufferError)]
    #[case(zlib::Z_VERSION_ERROR, EngineStatus::VersionError)]
    #[case(-42, EngineStatus::Unknown(-42))]
    fn test_engine_status_mapping(#[case] code: c_int, #[case] expected: EngineStatus) {
        assert_eq!(engine_status(code), expected);
    }

    #[test]
    fn test_flush_and_strategy_codes() {
        assert_eq!(flush_code(FlushMode::default()), zlib::Z_PARTIAL_FLUSH);
        assert_eq!(flush_code(FlushMode::None), zlib::Z_NO_FLUSH);
        assert_eq!(flush_code(FlushMode::Sync), zlib::Z_SYNC_FLUSH);
        assert_eq!(
            strategy_code(CompressionStrategy::default()),
            zlib::Z_DEFAULT_STRATEGY
        );
        assert_eq!(strategy_code(CompressionStrategy::Rle), zlib::Z_RLE);
    }

    #[test]
    fn test_engine_default_allocator_roundtrip() {
        let mut stream = DeflateStream::new(&CompressionConfig::default(), None).unwrap();
        assert_eq!(stream.allocator_name(), "engine");

        let mut out = vec![0u8; 256];
        let step = stream.deflate(b"hello", &mut out, zlib::Z_FINISH).unwrap();
        assert!(step.stream_end);
        assert_eq!(step.consumed, 5);
        assert_eq!(&out[..3], &[0x1f, 0x8b, 0x08]);
    }

    #[test]
    fn test_engine_frees_before_allocator_release() {
        let tracker = TrackingAllocator::new();
        let stream = DeflateStream::new(
            &CompressionConfig::default(),
            Some(PinnedAllocator::new(tracker.clone())),
        )
        .unwrap();

        let live = tracker.snapshot();
        assert!(live.allocations > 0);
        assert!(live.live_bytes > 0);

        drop(stream);

        let snap = tracker.snapshot();
        assert_eq!(snap.deallocations, snap.allocations);
        assert_eq!(snap.live_bytes, 0);
    }

    #[test]
    fn test_init_out_of_memory_is_unwound() {
        let budget = std::sync::Arc::new(LimitedAllocator::new(1024));
        let result = DeflateStream::new(
            &CompressionConfig::default(),
            Some(PinnedAllocator::new(std::sync::Arc::clone(&budget))),
        );

        let error = result.err().unwrap();
        assert_eq!(error.engine_status(), Some(EngineStatus::MemoryError));
        assert_eq!(budget.in_use(), 0);
        // The pinned clone was released along with the failed stream.
        assert_eq!(std::sync::Arc::strong_count(&budget), 1);
    }
}
