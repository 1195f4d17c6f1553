//! C-ABI allocation callbacks
//!
//! These are the two function pointers a zlib-style engine accepts in place of
//! its own allocator. The opaque context is a pointer to a pinned
//! [`HostAllocator`]; the payload size needed at free time travels in the
//! block's [`AllocationHeader`](crate::header::AllocationHeader).

use std::ffi::{c_uint, c_void};
use std::ptr::{self, NonNull};

use crate::allocator::HostAllocator;
use crate::header::{self, MAX_ALIGN};

/// `alloc(opaque, items, size) -> ptr` callback type
pub type AllocFn = unsafe extern "C" fn(*mut c_void, c_uint, c_uint) -> *mut c_void;

/// `free(opaque, ptr)` callback type
pub type FreeFn = unsafe extern "C" fn(*mut c_void, *mut c_void);

/// Allocate `items * size` bytes from the host allocator behind `opaque`.
///
/// Returns null when the context is null, the size computation overflows or
/// the host allocator refuses the request. The callback ABI has no other error
/// channel.
///
/// # Safety
///
/// A non-null `opaque` must point to a live `A`.
pub unsafe extern "C" fn allocate<A: HostAllocator>(
    opaque: *mut c_void,
    items: c_uint,
    size: c_uint,
) -> *mut c_void {
    if opaque.is_null() {
        return ptr::null_mut();
    }
    let host = &*opaque.cast::<A>();

    let Some(payload) = (items as usize).checked_mul(size as usize) else {
        return ptr::null_mut();
    };
    let Some(layout) = header::block_layout(payload) else {
        return ptr::null_mut();
    };

    match host.allocate(layout) {
        Some(block) => header::write_header(block, payload).as_ptr().cast(),
        None => ptr::null_mut(),
    }
}

/// Return a block obtained from [`allocate`] to the host allocator.
///
/// A null context or null address is ignored. Debug builds verify the header
/// tag first and abort the process on mismatch: the recorded size cannot be
/// trusted, and freeing with a wrong size corrupts the host heap.
///
/// # Safety
///
/// A non-null `address` must have been returned by [`allocate`] with the same
/// `A` behind `opaque`, and must not have been freed already.
pub unsafe extern "C" fn free<A: HostAllocator>(opaque: *mut c_void, address: *mut c_void) {
    if opaque.is_null() {
        return;
    }
    let Some(payload) = NonNull::new(address.cast::<u8>()) else {
        return;
    };
    let host = &*opaque.cast::<A>();

    let (block, header) = header::read_header(payload);

    #[cfg(debug_assertions)]
    if let Err(corruption) = header.verify() {
        tracing::error!(?address, %corruption, "refusing to free block");
        std::process::abort();
    }

    // SAFETY: the header was written by `allocate`, whose layout for this size
    // was validated by `block_layout`.
    let layout =
        std::alloc::Layout::from_size_align_unchecked(header::HEADER_SIZE + header.size, MAX_ALIGN);
    host.deallocate(block, layout);
}
