//! Fixed-size block recycling pool
//!
//! # Safety
//!
//! `BlockPool` owns every cached block and the bookkeeping stack; callers own
//! every outstanding [`Block`]:
//! - Cached pointers live only in the `BlockStack`; `acquire` pops one and
//!   wraps it in a `Block`, `release` unwraps a `Block` and pushes it
//! - Every block and the stack storage come from `allocator` and go back to
//!   the same allocator with the same layout
//! - The pool is `!Sync` (`Cell`/`RefCell` state), so operations on one pool
//!   never interleave
//!
//! ## Invariants
//!
//! - `cached.len() <= capacity`
//! - every cached block is `block_layout.size()` bytes
//! - `outstanding` counts `acquire` calls not matched by a `release`

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::NonNull;

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

use super::guard::PooledBlock;
use super::stack::BlockStack;
use super::stats::StatsCounters;
use super::{PoolConfig, PoolStats};
use crate::allocator::{Allocator, SystemAllocator};
use crate::block::Block;
use crate::error::{Contract, PoolError, PoolResult};

/// Pool of equally sized memory blocks with a bounded LIFO cache
///
/// Released blocks are cached up to `capacity` and handed out again most
/// recently released first. Misses go to the allocator; releases into a full
/// cache go straight back to it.
///
/// # Example
/// ```
/// use nebula_mempool::BlockPool;
///
/// let pool = BlockPool::new(64, 2)?;
///
/// let mut block = pool.acquire()?;
/// block.fill(0);
/// let id = block.id();
/// pool.release(block)?;
///
/// // LIFO reuse: the block just released comes back first
/// let again = pool.acquire()?;
/// assert_eq!(again.id(), id);
/// pool.release(again)?;
///
/// pool.destroy().map_err(|e| e.into_error())?;
/// # Ok::<(), nebula_mempool::PoolError>(())
/// ```
pub struct BlockPool<A: Allocator = SystemAllocator> {
    allocator: A,
    config: PoolConfig,
    block_layout: Layout,
    cached: RefCell<BlockStack>,
    outstanding: Cell<usize>,
    stats: StatsCounters,
}

impl BlockPool<SystemAllocator> {
    /// Create a pool of `block_size`-byte blocks caching up to `capacity`
    pub fn new(block_size: usize, capacity: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig::new(block_size, capacity))
    }

    /// Create pool with custom configuration
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        Self::with_allocator(config, SystemAllocator::new())
    }
}

impl<A: Allocator> BlockPool<A> {
    /// Create pool drawing memory from `allocator`
    ///
    /// Allocates only the bookkeeping stack; no block is allocated until the
    /// first `acquire` or an explicit [`prewarm`](Self::prewarm).
    pub fn with_allocator(config: PoolConfig, allocator: A) -> PoolResult<Self> {
        config.validate()?;
        let block_layout = config.block_layout()?;
        let cached = BlockStack::new(&allocator, config.capacity)?;

        #[cfg(feature = "logging")]
        debug!(
            block_size = block_layout.size(),
            block_align = block_layout.align(),
            capacity = config.capacity,
            "block pool created"
        );

        Ok(Self {
            allocator,
            config,
            block_layout,
            cached: RefCell::new(cached),
            outstanding: Cell::new(0),
            stats: StatsCounters::default(),
        })
    }

    /// Lend a block to the caller
    ///
    /// Returns the most recently cached block, or a fresh one from the
    /// allocator when the cache is empty. Contents are unspecified.
    pub fn acquire(&self) -> PoolResult<Block> {
        let reused = self.cached.borrow_mut().pop();

        let ptr = match reused {
            Some(ptr) => {
                self.stats.record_hit();
                ptr
            }
            None => {
                let ptr = self.allocate_block()?;
                self.stats.record_miss();

                #[cfg(feature = "logging")]
                trace!(
                    block_size = self.block_layout.size(),
                    outstanding = self.outstanding.get() + 1,
                    "block pool miss"
                );

                ptr
            }
        };

        self.outstanding.set(self.outstanding.get() + 1);

        // SAFETY: `ptr` addresses `block_layout.size()` bytes owned by the pool
        // until now; ownership moves to the returned handle.
        Ok(unsafe { Block::from_raw(ptr, self.block_layout.size()) })
    }

    /// Take a block back from the caller
    ///
    /// The block must have been acquired from this pool. Provenance is not
    /// tracked, but a block whose size or alignment cannot match this pool is
    /// refused. With room in the cache the block is kept for reuse, otherwise
    /// it goes back to the allocator.
    ///
    /// # Errors
    /// - [`Contract::ForeignBlock`] when the block's length differs from
    ///   `block_size` or its address is not aligned to `block_align`
    /// - [`Contract::NoOutstandingBlocks`] when no block is lent out
    ///
    /// The block is leaked in both cases, since it cannot belong to this pool.
    pub fn release(&self, block: Block) -> PoolResult<()> {
        let len = block.len();
        if len != self.block_layout.size()
            || !block.as_ptr().addr().is_multiple_of(self.block_layout.align())
        {
            let _ = block.into_raw();
            return Err(PoolError::contract_violation(Contract::ForeignBlock {
                len,
                block_size: self.block_layout.size(),
            }));
        }

        let outstanding = self.outstanding.get();
        if outstanding == 0 {
            let _ = block.into_raw();
            return Err(PoolError::contract_violation(
                Contract::NoOutstandingBlocks,
            ));
        }

        self.outstanding.set(outstanding - 1);
        let ptr = block.into_raw();

        let mut cached = self.cached.borrow_mut();
        if cached.is_full() {
            drop(cached);
            self.evict(ptr);
            return Ok(());
        }

        if let Some(pattern) = self.config.release_pattern {
            // SAFETY: the block is `block_layout.size()` bytes and owned by the
            // pool again.
            unsafe { ptr.as_ptr().write_bytes(pattern, self.block_layout.size()) };
        }

        let pushed = cached.push(ptr);
        debug_assert!(pushed.is_ok());
        self.stats.record_release();
        Ok(())
    }

    /// Acquire a block wrapped in a guard that releases it on drop
    pub fn get(&self) -> PoolResult<PooledBlock<'_, A>> {
        let block = self.acquire()?;
        Ok(PooledBlock::new(block, self))
    }

    /// Fill the cache with up to `count` fresh blocks
    ///
    /// Never grows the cache past `capacity`. Returns the number of blocks
    /// added; on allocation failure the blocks added so far stay cached.
    pub fn prewarm(&self, count: usize) -> PoolResult<usize> {
        let room = self.capacity() - self.cached();
        let target = count.min(room);

        for added in 0..target {
            let ptr = match self.allocate_block() {
                Ok(ptr) => ptr,
                Err(err) => {
                    #[cfg(feature = "logging")]
                    warn!(added, requested = count, "block pool prewarm stopped early");
                    #[cfg(not(feature = "logging"))]
                    let _ = added;
                    return Err(err);
                }
            };
            let pushed = self.cached.borrow_mut().push(ptr);
            debug_assert!(pushed.is_ok());
        }

        #[cfg(feature = "logging")]
        debug!(added = target, cached = self.cached(), "block pool prewarmed");

        Ok(target)
    }

    /// Release cached blocks to the allocator until at most `len` remain
    ///
    /// Returns the number of blocks released.
    pub fn shrink_to(&self, len: usize) -> usize {
        let mut released = 0;

        loop {
            let ptr = {
                let mut cached = self.cached.borrow_mut();
                if cached.len() <= len {
                    break;
                }
                cached.pop()
            };
            let Some(ptr) = ptr else { break };
            self.evict(ptr);
            released += 1;
        }

        #[cfg(feature = "logging")]
        debug!(released, cached = self.cached(), "block pool shrunk");

        released
    }

    /// Tear the pool down
    ///
    /// Every cached block goes back to the allocator, followed by the
    /// bookkeeping storage.
    ///
    /// # Errors
    /// [`Contract::OutstandingOnDestroy`] while blocks are still lent out. The
    /// pool is returned untouched inside the error so the caller can release
    /// them and try again.
    pub fn destroy(self) -> Result<(), DestroyError<A>> {
        let outstanding = self.outstanding.get();
        if outstanding != 0 {
            return Err(DestroyError {
                error: PoolError::contract_violation(Contract::OutstandingOnDestroy {
                    outstanding,
                }),
                pool: self,
            });
        }

        drop(self);
        Ok(())
    }

    /// Size of every block in bytes
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_layout.size()
    }

    /// Alignment of every block in bytes
    #[inline]
    pub fn block_align(&self) -> usize {
        self.block_layout.align()
    }

    /// Layout of every block
    #[inline]
    pub fn block_layout(&self) -> Layout {
        self.block_layout
    }

    /// Maximum number of idle blocks cached
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of idle blocks currently cached
    #[inline]
    pub fn cached(&self) -> usize {
        self.cached.borrow().len()
    }

    /// Number of blocks currently lent out
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// Whether every acquired block has been released
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.outstanding.get() == 0
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Allocator backing this pool
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot(self.cached(), self.outstanding())
    }

    fn allocate_block(&self) -> PoolResult<NonNull<u8>> {
        // SAFETY: block_layout was validated at construction and has non-zero
        // size.
        let block = unsafe { self.allocator.allocate(self.block_layout)? };
        let ptr = block.cast::<u8>();

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: freshly allocated, `block_layout.size()` writable bytes.
            unsafe { ptr.as_ptr().write_bytes(pattern, self.block_layout.size()) };
        }

        Ok(ptr)
    }

    fn evict(&self, ptr: NonNull<u8>) {
        // SAFETY: every block handled by this pool was allocated from
        // `allocator` with `block_layout`.
        unsafe { self.allocator.deallocate(ptr, self.block_layout) };
        self.stats.record_eviction();

        #[cfg(feature = "logging")]
        trace!(block_size = self.block_layout.size(), "block evicted to allocator");
    }
}

impl<A: Allocator> Drop for BlockPool<A> {
    fn drop(&mut self) {
        let outstanding = self.outstanding.get();

        #[cfg(feature = "logging")]
        {
            if outstanding > 0 {
                warn!(outstanding, "block pool dropped with outstanding blocks");
            }
        }

        let layout = self.block_layout;
        let allocator = &self.allocator;
        let cached = self.cached.get_mut();
        let mut freed = 0usize;

        while let Some(ptr) = cached.pop() {
            // SAFETY: cached blocks were allocated from `allocator` with `layout`.
            unsafe { allocator.deallocate(ptr, layout) };
            freed += 1;
        }

        // SAFETY: the stack was created from this allocator and is now empty.
        unsafe { cached.release_storage(allocator) };

        #[cfg(feature = "logging")]
        debug!(freed, outstanding, "block pool destroyed");
        #[cfg(not(feature = "logging"))]
        let _ = (freed, outstanding);
    }
}

impl<A: Allocator> fmt::Debug for BlockPool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("block_size", &self.block_size())
            .field("block_align", &self.block_align())
            .field("capacity", &self.capacity())
            .field("cached", &self.cached())
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

// SAFETY: the pool exclusively owns its cached blocks and stack storage, so
// moving it to another thread moves that ownership too. It stays !Sync.
unsafe impl<A: Allocator + Send> Send for BlockPool<A> {}

/// Rejected [`BlockPool::destroy`], carrying the still-live pool
#[derive(Error)]
#[error("{error}")]
pub struct DestroyError<A: Allocator = SystemAllocator> {
    error: PoolError,
    pool: BlockPool<A>,
}

impl<A: Allocator> DestroyError<A> {
    /// The contract violation that rejected the call
    pub fn error(&self) -> &PoolError {
        &self.error
    }

    /// The pool, unchanged
    pub fn pool(&self) -> &BlockPool<A> {
        &self.pool
    }

    /// Take the pool back to release outstanding blocks
    pub fn into_pool(self) -> BlockPool<A> {
        self.pool
    }

    /// Drop the pool and keep the error
    pub fn into_error(self) -> PoolError {
        self.error
    }
}

impl<A: Allocator> fmt::Debug for DestroyError<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyError")
            .field("error", &self.error)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TrackedAllocator;

    fn tracked_pool(
        allocator: &TrackedAllocator,
        block_size: usize,
        capacity: usize,
    ) -> BlockPool<&TrackedAllocator> {
        BlockPool::with_allocator(PoolConfig::new(block_size, capacity), allocator).unwrap()
    }

    #[test]
    fn test_create_allocates_no_blocks() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let pool = tracked_pool(&allocator, 64, 4);

        assert_eq!(pool.block_size(), 64);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.cached(), 0);
        assert_eq!(pool.outstanding(), 0);
        // Only the bookkeeping stack
        assert_eq!(allocator.allocation_count(), 1);

        pool.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_invalid_block_size() {
        let err = BlockPool::new(0, 4).unwrap_err();
        assert_eq!(err.code(), "POOL:CONFIG:INVALID");
    }

    #[test]
    fn test_acquire_miss_then_hit() {
        let pool = BlockPool::new(128, 2).unwrap();

        let block = pool.acquire().unwrap();
        assert_eq!(block.len(), 128);
        let id = block.id();
        pool.release(block).unwrap();

        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), id);
        pool.release(again).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.cached, 1);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn test_blocks_are_aligned() {
        let pool =
            BlockPool::with_config(PoolConfig::new(100, 4).with_block_align(64)).unwrap();
        let block = pool.acquire().unwrap();
        assert_eq!(block.as_ptr() as usize % 64, 0);
        pool.release(block).unwrap();
    }

    #[test]
    fn test_full_cache_evicts_to_allocator() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let pool = tracked_pool(&allocator, 32, 1);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        assert_eq!(pool.cached(), 1);
        assert_eq!(pool.stats().evicted, 1);
        // stack + two blocks allocated, one block returned
        assert_eq!(allocator.allocation_count(), 3);
        assert_eq!(allocator.deallocation_count(), 1);

        pool.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_zero_capacity_passes_through() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let pool = tracked_pool(&allocator, 16, 0);

        let block = pool.acquire().unwrap();
        pool.release(block).unwrap();

        assert_eq!(pool.cached(), 0);
        assert_eq!(allocator.allocation_count(), 1);
        assert_eq!(allocator.deallocation_count(), 1);

        pool.destroy().unwrap();
    }

    #[test]
    fn test_release_without_outstanding_is_rejected() {
        let donor = BlockPool::new(16, 1).unwrap();
        let pool = BlockPool::new(16, 1).unwrap();

        let stray = donor.acquire().unwrap();
        let err = pool.release(stray).unwrap_err();
        assert_eq!(err.contract(), Some(Contract::NoOutstandingBlocks));
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.cached(), 0);
    }

    #[test]
    fn test_destroy_rejected_returns_pool() {
        let pool = BlockPool::new(16, 2).unwrap();
        let block = pool.acquire().unwrap();

        let err = pool.destroy().unwrap_err();
        assert_eq!(
            err.error().contract(),
            Some(Contract::OutstandingOnDestroy { outstanding: 1 })
        );

        let pool = err.into_pool();
        pool.release(block).unwrap();
        pool.destroy().unwrap();
    }

    #[test]
    fn test_allocation_failure_leaves_counts_untouched() {
        let stack_bytes = core::mem::size_of::<NonNull<u8>>();
        let allocator = TrackedAllocator::new(SystemAllocator::new()).with_budget(stack_bytes + 64);
        let pool = tracked_pool(&allocator, 64, 1);

        let block = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        assert_eq!(err, PoolError::AllocationFailed { size: 64, align: 16 });
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.stats().misses, 1);

        pool.release(block).unwrap();
        pool.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_patterns_applied() {
        let pool = BlockPool::with_config(PoolConfig::debug(8, 1)).unwrap();

        let block = pool.acquire().unwrap();
        // SAFETY: alloc_pattern initializes fresh blocks.
        assert_eq!(unsafe { block.as_slice() }, &[0xBB; 8]);
        pool.release(block).unwrap();

        let block = pool.acquire().unwrap();
        // SAFETY: release_pattern initialized the cached block.
        assert_eq!(unsafe { block.as_slice() }, &[0xDD; 8]);
        pool.release(block).unwrap();
    }

    #[test]
    fn test_prewarm_respects_capacity() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let pool = tracked_pool(&allocator, 32, 3);

        assert_eq!(pool.prewarm(10).unwrap(), 3);
        assert_eq!(pool.cached(), 3);
        assert_eq!(pool.prewarm(1).unwrap(), 0);

        let block = pool.acquire().unwrap();
        assert_eq!(pool.stats().hits, 1);
        pool.release(block).unwrap();

        pool.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_shrink_to_evicts_excess() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let pool = tracked_pool(&allocator, 32, 4);
        pool.prewarm(4).unwrap();

        assert_eq!(pool.shrink_to(1), 3);
        assert_eq!(pool.cached(), 1);
        assert_eq!(pool.shrink_to(5), 0);
        assert_eq!(allocator.deallocation_count(), 3);

        pool.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_drop_frees_cache() {
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        {
            let pool = tracked_pool(&allocator, 32, 2);
            pool.prewarm(2).unwrap();
        }
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_release_rejects_smaller_block() {
        let small = BlockPool::new(8, 1).unwrap();
        let allocator = TrackedAllocator::new(SystemAllocator::new());
        let big = tracked_pool(&allocator, 4096, 1);

        let held = big.acquire().unwrap();
        let err = big.release(small.acquire().unwrap()).unwrap_err();
        assert_eq!(
            err.contract(),
            Some(Contract::ForeignBlock {
                len: 8,
                block_size: 4096
            })
        );
        assert_eq!(err.code(), "POOL:CONTRACT:FOREIGN_BLOCK");

        // Nothing about the big pool changed
        assert_eq!(big.outstanding(), 1);
        assert_eq!(big.cached(), 0);

        big.release(held).unwrap();
        let again = big.acquire().unwrap();
        assert_eq!(again.len(), 4096);
        big.release(again).unwrap();

        big.destroy().unwrap();
        assert!(!allocator.has_leaks());
    }

    #[test]
    fn test_release_rejects_misaligned_block() {
        let donor = BlockPool::new(128, 1).unwrap();
        let pool = BlockPool::with_config(PoolConfig::new(64, 1).with_block_align(16)).unwrap();

        let held = pool.acquire().unwrap();
        let base = donor.acquire().unwrap().into_raw();

        // Right length, shifted off the pool's alignment
        // SAFETY: bytes 1..65 lie inside the donor's 128-byte block.
        let shifted = unsafe { Block::from_raw(base.add(1), 64) };
        let err = pool.release(shifted).unwrap_err();
        assert!(matches!(err.contract(), Some(Contract::ForeignBlock { .. })));
        assert_eq!(pool.outstanding(), 1);

        pool.release(held).unwrap();
    }

    #[test]
    fn test_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<BlockPool>();
        assert_send::<Block>();
    }
}
