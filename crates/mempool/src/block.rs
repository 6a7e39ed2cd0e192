//! Owned handle to one pool block
//!
//! # Safety
//!
//! A [`Block`] is the exclusive owner of `len` bytes obtained from a pool's
//! allocator. Ownership moves by value: `BlockPool::acquire` hands a `Block`
//! out and `BlockPool::release` consumes it, so a block can never be referenced
//! by the pool's cache and a caller at the same time, and double release is
//! rejected by the compiler.
//!
//! Block contents are never zeroed. Reading through [`Block::as_slice`] is only
//! sound after the bytes have been written, which is why the safe accessors
//! hand out `MaybeUninit<u8>` or initialize first ([`Block::fill`]).

use core::fmt;
use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::warn;

/// Stable identity of a block, derived from its address
///
/// Two handles with equal ids refer to the same memory. Ids of blocks that
/// went back to the allocator may be reused by later allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    /// Raw address of the block
    #[inline]
    pub fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Fixed-size block lent out by a [`BlockPool`](crate::BlockPool)
///
/// Hand it back with `release`. A block dropped without release leaks its
/// memory; the drop is logged.
#[must_use = "blocks must be released back to their pool"]
pub struct Block {
    ptr: NonNull<u8>,
    len: usize,
}

impl Block {
    /// Wraps raw block memory
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes and exclusively
    /// owned by the new handle.
    #[inline]
    pub(crate) unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Gives up the handle without running the leak check
    #[inline]
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        let this = ManuallyDrop::new(self);
        this.ptr
    }

    /// Identity of the underlying memory
    #[inline]
    pub fn id(&self) -> BlockId {
        BlockId(self.ptr.as_ptr() as usize)
    }

    /// Size of the block in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false` for pool blocks; present for slice-like symmetry
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer to the first byte
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Raw mutable pointer to the first byte
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// The block as possibly-uninitialized bytes
    #[inline]
    pub fn as_uninit_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: the handle exclusively owns `len` writable bytes, and
        // MaybeUninit<u8> has no validity requirement.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }

    /// Writes `byte` over the whole block and returns it initialized
    pub fn fill(&mut self, byte: u8) -> &mut [u8] {
        // SAFETY: exclusive ownership of `len` writable bytes; every byte is
        // initialized by write_bytes before the slice is formed.
        unsafe {
            self.ptr.as_ptr().write_bytes(byte, self.len);
            core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
        }
    }

    /// The block contents as bytes
    ///
    /// # Safety
    /// Every byte must have been initialized since the block was acquired, or
    /// the pool must be configured with an allocation fill pattern and the
    /// block must be fresh.
    #[inline]
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: caller guarantees initialization; the handle owns `len` bytes.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The block contents as mutable bytes
    ///
    /// # Safety
    /// Same requirements as [`Block::as_slice`].
    #[inline]
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: caller guarantees initialization; the handle owns `len` bytes.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id())
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        warn!(block = %self.id(), len = self.len, "block dropped without release; memory leaked");
    }
}

// SAFETY: a Block is the unique owner of its memory, like Box<[u8]>; moving it
// to another thread moves that ownership with it.
unsafe impl Send for Block {}

// SAFETY: shared references only expose raw pointers and `len`; every access
// to the bytes goes through `&mut self` or an `unsafe` accessor.
unsafe impl Sync for Block {}
