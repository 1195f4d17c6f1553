//! Heap-pinned allocator handle
//!
//! The engine carries a single untyped context pointer for its allocation
//! callbacks, and keeps using it for as long as its state lives. A
//! [`PinnedAllocator`] moves the caller's allocator into a heap box whose
//! address never changes, and pairs that address with the matching
//! monomorphized callbacks.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::allocator::HostAllocator;
use crate::callbacks::{self, AllocFn, FreeFn};

/// Owned, address-stable allocator plus the callbacks that use it
///
/// Dropping the handle frees the boxed allocator. The owner must tear down
/// every consumer of [`PinnedAllocator::opaque`] first.
pub struct PinnedAllocator {
    context: NonNull<c_void>,
    alloc_fn: AllocFn,
    free_fn: FreeFn,
    release: unsafe fn(NonNull<c_void>),
    type_name: &'static str,
}

unsafe fn release<A>(context: NonNull<c_void>) {
    drop(Box::from_raw(context.cast::<A>().as_ptr()));
}

impl PinnedAllocator {
    /// Move `allocator` to the heap and build its callback pair
    pub fn new<A: HostAllocator + 'static>(allocator: A) -> Self {
        let context = NonNull::from(Box::leak(Box::new(allocator))).cast::<c_void>();
        tracing::trace!(
            allocator = std::any::type_name::<A>(),
            context = ?context,
            "pinned host allocator"
        );
        Self {
            context,
            alloc_fn: callbacks::allocate::<A>,
            free_fn: callbacks::free::<A>,
            release: release::<A>,
            type_name: std::any::type_name::<A>(),
        }
    }

    /// Opaque context pointer to hand to the engine
    pub fn opaque(&self) -> *mut c_void {
        self.context.as_ptr()
    }

    /// Allocation callback bound to this allocator's type
    pub fn alloc_fn(&self) -> AllocFn {
        self.alloc_fn
    }

    /// Free callback bound to this allocator's type
    pub fn free_fn(&self) -> FreeFn {
        self.free_fn
    }

    /// Type name of the pinned allocator, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for PinnedAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedAllocator")
            .field("allocator", &self.type_name)
            .field("context", &self.context)
            .finish()
    }
}

impl Drop for PinnedAllocator {
    fn drop(&mut self) {
        tracing::trace!(allocator = self.type_name, "releasing pinned allocator");
        // SAFETY: `context` came from `Box::leak` of the type `release` was
        // instantiated with, and is released exactly once.
        unsafe { (self.release)(self.context) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{GlobalAllocator, TrackingAllocator};
    use crate::header::{HEADER_SIZE, MAX_ALIGN};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_is_stable_across_moves() {
        let pinned = PinnedAllocator::new(GlobalAllocator);
        let before = pinned.opaque();
        let moved = Box::new(pinned);
        assert_eq!(moved.opaque(), before);
    }

    #[test]
    fn test_callbacks_route_to_pinned_allocator() {
        let tracker = TrackingAllocator::new();
        let pinned = PinnedAllocator::new(tracker.clone());

        unsafe {
            let ptr = (pinned.alloc_fn())(pinned.opaque(), 3, 100);
            assert!(!ptr.is_null());
            assert_eq!(tracker.snapshot().live_bytes, HEADER_SIZE + 300);
            (pinned.free_fn())(pinned.opaque(), ptr);
        }

        assert_eq!(tracker.snapshot().live_bytes, 0);
        assert!(pinned.type_name().contains("TrackingAllocator"));
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl HostAllocator for DropCounter {
        fn allocate(&self, layout: std::alloc::Layout) -> Option<NonNull<u8>> {
            GlobalAllocator.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: std::alloc::Layout) {
            GlobalAllocator.deallocate(ptr, layout);
        }
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_releases_allocator_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let pinned = PinnedAllocator::new(DropCounter(Arc::clone(&drops)));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(pinned);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    proptest! {
        /// Recorded sizes match the request and every live block verifies
        #[test]
        fn test_header_records_requested_size(
            requests in proptest::collection::vec((0u32..64, 1u32..2048), 1..32),
            free_reversed in any::<bool>(),
        ) {
            let tracker = TrackingAllocator::new();
            let pinned = PinnedAllocator::new(tracker.clone());
            let mut live = Vec::new();

            for (items, size) in &requests {
                let ptr = unsafe { (pinned.alloc_fn())(pinned.opaque(), *items, *size) };
                prop_assert!(!ptr.is_null());
                prop_assert_eq!(ptr as usize % MAX_ALIGN, 0);

                let payload = NonNull::new(ptr.cast::<u8>()).unwrap();
                let (_, header) = unsafe { crate::header::read_header(payload) };
                prop_assert_eq!(header.verify(), Ok(*items as usize * *size as usize));
                live.push(ptr);
            }

            let expected: usize = requests
                .iter()
                .map(|(items, size)| HEADER_SIZE + *items as usize * *size as usize)
                .sum();
            prop_assert_eq!(tracker.snapshot().live_bytes, expected);

            if free_reversed {
                live.reverse();
            }
            for ptr in live {
                unsafe { (pinned.free_fn())(pinned.opaque(), ptr) };
            }

            let snap = tracker.snapshot();
            prop_assert_eq!(snap.live_bytes, 0);
            prop_assert_eq!(snap.live_allocations(), 0);
        }
    }
}
