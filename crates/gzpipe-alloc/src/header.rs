//! In-band allocation header
//!
//! Every block handed out by the shim starts with an [`AllocationHeader`]
//! recording the payload size, because the C free callback only receives the
//! payload pointer. The header occupies [`HEADER_SIZE`] bytes, rounded up to
//! [`MAX_ALIGN`] so the payload that follows is aligned for any scalar type.

use std::alloc::Layout;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

/// Sentinel stored in every header
pub const HEADER_TAG: usize = 0xA110_CA7E;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

const fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

/// Largest alignment required by any scalar type on this platform
pub const MAX_ALIGN: usize = max(
    max(align_of::<u128>(), align_of::<f64>()),
    max(align_of::<u64>(), align_of::<*const u8>()),
);

/// Bytes reserved in front of every payload
pub const HEADER_SIZE: usize = round_up(size_of::<AllocationHeader>(), MAX_ALIGN);

const _: () = assert!(MAX_ALIGN.is_power_of_two());
const _: () = assert!(HEADER_SIZE >= size_of::<AllocationHeader>());
const _: () = assert!(HEADER_SIZE % MAX_ALIGN == 0);

/// Metadata stored immediately before a shim-managed payload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationHeader {
    /// Always [`HEADER_TAG`] for a live block
    pub tag: usize,
    /// Payload size requested at allocation (`items * item_size`)
    pub size: usize,
}

/// A header whose tag does not match [`HEADER_TAG`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("allocation header corrupted: found tag {found:#x}, expected {:#x}", HEADER_TAG)]
pub struct HeaderCorruption {
    /// Tag value actually present in memory
    pub found: usize,
}

impl AllocationHeader {
    /// Header for a freshly allocated payload of `size` bytes
    pub const fn new(size: usize) -> Self {
        Self {
            tag: HEADER_TAG,
            size,
        }
    }

    /// Check the tag and return the recorded payload size
    pub fn verify(&self) -> Result<usize, HeaderCorruption> {
        if self.tag == HEADER_TAG {
            Ok(self.size)
        } else {
            Err(HeaderCorruption { found: self.tag })
        }
    }
}

/// Layout of a whole block (header + `payload` bytes)
///
/// Returns `None` when the total size overflows or exceeds what a [`Layout`]
/// can describe.
pub fn block_layout(payload: usize) -> Option<Layout> {
    let total = HEADER_SIZE.checked_add(payload)?;
    Layout::from_size_align(total, MAX_ALIGN).ok()
}

/// Write a header at the start of `block` and return the payload pointer.
///
/// # Safety
///
/// `block` must be valid for writes of [`HEADER_SIZE`] bytes and aligned to
/// [`MAX_ALIGN`].
pub(crate) unsafe fn write_header(block: NonNull<u8>, payload: usize) -> NonNull<u8> {
    block
        .cast::<AllocationHeader>()
        .as_ptr()
        .write(AllocationHeader::new(payload));
    NonNull::new_unchecked(block.as_ptr().add(HEADER_SIZE))
}

/// Recover the block start and header for a payload pointer.
///
/// # Safety
///
/// `payload` must have been returned by [`write_header`] and the block must
/// still be allocated.
pub(crate) unsafe fn read_header(payload: NonNull<u8>) -> (NonNull<u8>, AllocationHeader) {
    let block = payload.as_ptr().sub(HEADER_SIZE);
    let header = block.cast::<AllocationHeader>().read();
    (NonNull::new_unchecked(block), header)
}
