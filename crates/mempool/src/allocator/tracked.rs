//! Tracked allocator implementation
//!
//! Wraps another allocator and counts every allocation, deallocation and
//! failure. An optional byte budget turns the wrapper into a bounded
//! allocator, which is how exhaustion is exercised without actually running
//! the process out of memory.
//!
//! ## Invariants
//!
//! - Every successful allocation is counted and adds to `live_bytes`
//! - Every deallocation is counted and subtracts from `live_bytes`
//! - Failed allocations only bump the failure counter

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{Allocator, SystemAllocator};
use crate::error::{PoolError, PoolResult};

/// A wrapper allocator that tracks traffic to its inner allocator
#[derive(Debug, Default)]
pub struct TrackedAllocator<A = SystemAllocator> {
    inner: A,
    budget: Option<usize>,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    failed: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

impl<A> TrackedAllocator<A> {
    /// Creates a new TrackedAllocator wrapping the provided allocator
    pub fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            budget: None,
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
        }
    }

    /// Caps the number of simultaneously live bytes
    ///
    /// Requests that would push `live_bytes` above `budget` fail with
    /// [`PoolError::AllocationFailed`].
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Gets a reference to the underlying allocator
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Consumes the tracker and returns the underlying allocator
    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Total successful allocations
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Total deallocations
    pub fn deallocation_count(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Allocations refused by the budget or the inner allocator
    pub fn failed_allocations(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Bytes currently allocated and not yet returned
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// High-water mark of `live_bytes`
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Allocations not matched by a deallocation
    pub fn live_allocations(&self) -> usize {
        self.allocation_count()
            .saturating_sub(self.deallocation_count())
    }

    /// Check if there are any allocations still outstanding
    pub fn has_leaks(&self) -> bool {
        self.live_allocations() > 0
    }

    fn reserve_budget(&self, size: usize) -> bool {
        let Some(budget) = self.budget else {
            self.live_bytes.fetch_add(size, Ordering::Relaxed);
            return true;
        };

        self.live_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| {
                live.checked_add(size).filter(|next| *next <= budget)
            })
            .is_ok()
    }
}

// SAFETY: TrackedAllocator forwards every call to the inner allocator and only
// adds bookkeeping; pointers are passed through untouched.
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        if !self.reserve_budget(layout.size()) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::allocation_failed_with_layout(layout));
        }

        // SAFETY: caller upholds the allocate contract for `layout`.
        match unsafe { self.inner.allocate(layout) } {
            Ok(ptr) => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                self.peak_bytes
                    .fetch_max(self.live_bytes(), Ordering::Relaxed);
                Ok(ptr)
            }
            Err(err) => {
                self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);

        // SAFETY: caller guarantees `ptr` came from this allocator with `layout`.
        unsafe { self.inner.deallocate(ptr, layout) };
    }
}
