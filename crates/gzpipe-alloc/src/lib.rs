//! Sized-allocation shim for C-ABI allocator callbacks
//!
//! C libraries such as zlib let the caller replace their allocator with a pair
//! of function pointers plus one opaque context pointer:
//!
//! ```text
//! alloc(opaque, items, size) -> ptr | NULL
//! free(opaque, ptr)
//! ```
//!
//! `free` never receives the block size, while Rust allocators need the full
//! [`Layout`](std::alloc::Layout) to deallocate. This crate bridges the two by
//! prefixing every block with a small header recording its size.
//!
//! # Layout
//!
//! ```text
//!  block start                      pointer handed to the engine
//!  │                                │
//!  ▼                                ▼
//!  ┌────────────────────────────────┬──────────────────────────────┐
//!  │ AllocationHeader { tag, size } │ payload (items * size bytes) │
//!  │ padded to MAX_ALIGN            │                              │
//!  └────────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use gzpipe_alloc::{PinnedAllocator, TrackingAllocator};
//!
//! let tracker = TrackingAllocator::new();
//! let pinned = PinnedAllocator::new(tracker.clone());
//!
//! unsafe {
//!     let ptr = (pinned.alloc_fn())(pinned.opaque(), 4, 256);
//!     assert!(!ptr.is_null());
//!     (pinned.free_fn())(pinned.opaque(), ptr);
//! }
//! assert_eq!(tracker.snapshot().live_bytes, 0);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod callbacks;
pub mod header;
pub mod pinned;

pub use allocator::{
    AllocationSnapshot, AllocationStats, GlobalAllocator, HostAllocator, LimitedAllocator,
    TrackingAllocator,
};
pub use callbacks::{AllocFn, FreeFn};
pub use header::{AllocationHeader, HeaderCorruption, HEADER_SIZE, HEADER_TAG, MAX_ALIGN};
pub use pinned::PinnedAllocator;
