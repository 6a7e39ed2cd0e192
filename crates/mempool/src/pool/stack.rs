//! Fixed-capacity LIFO of cached block pointers
//!
//! # Safety
//!
//! The slot array is allocated from the pool's allocator once, at creation,
//! and never grows:
//! - `slots[..len]` are initialized block pointers, `slots[len..capacity]` are
//!   uninitialized
//! - `push` refuses to write past `capacity`
//! - The stack has no `Drop`; the owning pool drains it and calls
//!   [`BlockStack::release_storage`] with the allocator it was created with

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::error::{PoolError, PoolResult};

pub(crate) struct BlockStack {
    slots: NonNull<NonNull<u8>>,
    len: usize,
    capacity: usize,
}

impl BlockStack {
    /// Allocates room for `capacity` pointers from `allocator`
    ///
    /// A zero-capacity stack owns no storage.
    pub(crate) fn new<A: Allocator + ?Sized>(allocator: &A, capacity: usize) -> PoolResult<Self> {
        if capacity == 0 {
            return Ok(Self {
                slots: NonNull::dangling(),
                len: 0,
                capacity,
            });
        }

        let layout = Self::storage_layout(capacity)?;
        // SAFETY: layout has non-zero size; the returned memory is only
        // written through `push` before being read.
        let storage = unsafe { allocator.allocate(layout)? };

        Ok(Self {
            slots: storage.cast::<NonNull<u8>>(),
            len: 0,
            capacity,
        })
    }

    fn storage_layout(capacity: usize) -> PoolResult<Layout> {
        Layout::array::<NonNull<u8>>(capacity).map_err(|_| {
            PoolError::invalid_config(format!(
                "capacity ({capacity}) overflows bookkeeping storage"
            ))
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Pushes `block`, or hands it back when the stack is full
    #[inline]
    pub(crate) fn push(&mut self, block: NonNull<u8>) -> Result<(), NonNull<u8>> {
        if self.is_full() {
            return Err(block);
        }

        // SAFETY: len < capacity, so the slot lies inside the allocation.
        unsafe { self.slots.as_ptr().add(self.len).write(block) };
        self.len += 1;
        Ok(())
    }

    /// Pops the most recently pushed block
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        // SAFETY: slot `len` was initialized by the matching push.
        Some(unsafe { self.slots.as_ptr().add(self.len).read() })
    }

    /// Returns the slot array to `allocator` and leaves a zero-capacity stack
    ///
    /// # Safety
    /// `allocator` must be the allocator passed to [`BlockStack::new`]. The
    /// stack must be empty, otherwise the cached blocks leak.
    pub(crate) unsafe fn release_storage<A: Allocator + ?Sized>(&mut self, allocator: &A) {
        debug_assert_eq!(self.len, 0, "bookkeeping released while blocks are cached");

        if self.capacity == 0 {
            return;
        }

        if let Ok(layout) = Self::storage_layout(self.capacity) {
            // SAFETY: same allocator and layout as in `new` (caller contract).
            unsafe { allocator.deallocate(self.slots.cast(), layout) };
        }

        self.slots = NonNull::dangling();
        self.len = 0;
        self.capacity = 0;
    }
}
