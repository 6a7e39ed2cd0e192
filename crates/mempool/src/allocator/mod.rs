//! Allocation capability used by block pools
//!
//! The pool never talks to the global allocator directly. Fresh blocks, the
//! pool's own bookkeeping storage, and evicted blocks all go through an
//! [`Allocator`], so callers can substitute an instrumented or budgeted
//! implementation.
//!
//! - [`SystemAllocator`]: delegates to the platform allocator
//! - [`TrackedAllocator`]: wraps another allocator and counts traffic
//!
//! # Safety
//!
//! `Allocator` is an unsafe trait. Implementors guarantee that:
//! - Returned pointers are valid, aligned to `layout.align()`, and exclusive
//! - `deallocate` accepts exactly the pointers `allocate` returned, with the
//!   same layout
//!
//! The blanket impl for `&A` forwards every call, so the contract carries over
//! unchanged.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::PoolResult;

mod system;
mod tracked;

pub use system::SystemAllocator;
pub use tracked::TrackedAllocator;

/// Raw memory provider
///
/// # Safety Requirements
///
/// Implementors must ensure that:
/// - Returned pointers are valid for reads and writes of `layout.size()` bytes
/// - Memory is aligned according to the layout
/// - Deallocation only occurs for previously allocated pointers
pub unsafe trait Allocator {
    /// Allocates memory with the given layout
    ///
    /// # Safety
    /// - Memory content is uninitialized and must be initialized before it is
    ///   read
    ///
    /// # Errors
    /// Returns [`PoolError::AllocationFailed`](crate::PoolError::AllocationFailed)
    /// when the request cannot be satisfied.
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator
    /// - `layout` must match the original allocation layout exactly
    /// - After this call, `ptr` becomes invalid and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

// SAFETY: Forwards to the referenced allocator; the contract is unchanged.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: caller upholds the contract of `A::allocate`.
        unsafe { (**self).allocate(layout) }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller upholds the contract of `A::deallocate`.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}
