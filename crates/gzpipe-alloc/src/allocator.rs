//! Host allocators the shim can forward to
//!
//! [`HostAllocator`] is the sized interface: callers must hand the same
//! [`Layout`] back on deallocation. The shim callbacks adapt it to the
//! unsized C ABI.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A general-purpose allocator that needs the block layout at free time
pub trait HostAllocator {
    /// Allocate a block for `layout`, or `None` if the request cannot be served.
    ///
    /// The shim never requests zero-sized layouts.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`HostAllocator::allocate`] on this
    /// allocator with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: HostAllocator + ?Sized> HostAllocator for Arc<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout);
    }
}

/// Rust's global allocator
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalAllocator;

impl HostAllocator for GlobalAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// Counters shared between clones of a [`TrackingAllocator`]
#[derive(Debug, Default)]
pub struct AllocationStats {
    allocations: AtomicU64,
    deallocations: AtomicU64,
    failures: AtomicU64,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

/// Point-in-time copy of [`AllocationStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationSnapshot {
    /// Successful allocations
    pub allocations: u64,
    /// Deallocations
    pub deallocations: u64,
    /// Requests the inner allocator refused
    pub failures: u64,
    /// Bytes currently allocated
    pub live_bytes: usize,
    /// Highest value `live_bytes` reached
    pub peak_bytes: usize,
}

impl AllocationSnapshot {
    /// Allocations not yet returned
    pub fn live_allocations(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }
}

impl AllocationStats {
    /// Take a snapshot of the counters
    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
        }
    }

    fn record_allocation(&self, size: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(size, Ordering::Relaxed) + size;
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
    }

    fn record_deallocation(&self, size: usize) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(size, Ordering::Relaxed);
    }
}

/// Allocator wrapper that counts what passes through it
///
/// Clones share the same counters, so a caller can keep one clone to inspect
/// while another is pinned inside a compressor.
#[derive(Debug, Clone, Default)]
pub struct TrackingAllocator<A = GlobalAllocator> {
    inner: A,
    stats: Arc<AllocationStats>,
}

impl TrackingAllocator<GlobalAllocator> {
    /// Track the global allocator
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A> TrackingAllocator<A> {
    /// Track an arbitrary host allocator
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            stats: Arc::new(AllocationStats::default()),
        }
    }

    /// Shared counters
    pub fn stats(&self) -> &Arc<AllocationStats> {
        &self.stats
    }

    /// Current counter values
    pub fn snapshot(&self) -> AllocationSnapshot {
        self.stats.snapshot()
    }
}

impl<A: HostAllocator> HostAllocator for TrackingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        match self.inner.allocate(layout) {
            Some(ptr) => {
                self.stats.record_allocation(layout.size());
                Some(ptr)
            }
            None => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.stats.record_deallocation(layout.size());
    }
}

/// Allocator wrapper that refuses requests beyond a byte budget
#[derive(Debug)]
pub struct LimitedAllocator<A = GlobalAllocator> {
    inner: A,
    limit: usize,
    in_use: AtomicUsize,
}

impl LimitedAllocator<GlobalAllocator> {
    /// Limit the global allocator to `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self::wrap(GlobalAllocator, limit)
    }
}

impl<A> LimitedAllocator<A> {
    /// Limit an arbitrary host allocator to `limit` bytes
    pub fn wrap(inner: A, limit: usize) -> Self {
        Self {
            inner,
            limit,
            in_use: AtomicUsize::new(0),
        }
    }

    /// Configured byte budget
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently charged against the budget
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

impl<A: HostAllocator> HostAllocator for LimitedAllocator<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let size = layout.size();
        let reserved = self
            .in_use
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                used.checked_add(size).filter(|total| *total <= self.limit)
            });
        if reserved.is_err() {
            tracing::debug!(
                requested = size,
                in_use = self.in_use(),
                limit = self.limit,
                "allocation refused by memory budget"
            );
            return None;
        }

        let ptr = self.inner.allocate(layout);
        if ptr.is_none() {
            self.in_use.fetch_sub(size, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.in_use.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}
