//! System allocator implementation
//!
//! Wraps the platform's default allocator behind the [`Allocator`] trait.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

use super::Allocator;
use crate::error::{PoolError, PoolResult};

/// Wrapper for the system's default allocator
///
/// Zero-sized requests return a well-aligned dangling pointer and never reach
/// the system allocator, which keeps a capacity-0 pool's empty bookkeeping
/// stack free of real allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

// SAFETY: Delegates to `std::alloc::System`, which upholds the contract for
// non-zero sizes; zero sizes return an aligned dangling pointer that is never
// handed back to `System`.
unsafe impl Allocator for SystemAllocator {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            // Dangling but aligned: `layout.align()` is a non-zero power of two.
            let dangling = NonNull::<u8>::dangling().with_addr(
                core::num::NonZeroUsize::new(layout.align())
                    .unwrap_or(core::num::NonZeroUsize::MIN),
            );
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }

        // SAFETY: layout has non-zero size (checked above).
        let ptr = unsafe { System.alloc(layout) };

        match NonNull::new(ptr) {
            Some(ptr) => Ok(NonNull::slice_from_raw_parts(ptr, layout.size())),
            None => Err(PoolError::allocation_failed_with_layout(layout)),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY: caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }
}
