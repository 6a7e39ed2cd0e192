//! Mutex-guarded block pool
//!
//! [`BlockPool`] is deliberately `!Sync`. Callers that cannot give each worker
//! its own pool can share one through [`SharedBlockPool`], which serializes
//! every operation behind a `parking_lot::Mutex`.

use parking_lot::Mutex;

use super::{BlockPool, DestroyError, PoolConfig, PoolStats};
use crate::allocator::{Allocator, SystemAllocator};
use crate::block::Block;
use crate::error::PoolResult;

/// Thread-safe wrapper around a [`BlockPool`]
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use nebula_mempool::SharedBlockPool;
///
/// let pool = Arc::new(SharedBlockPool::new(1024, 8)?);
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let pool = Arc::clone(&pool);
///         thread::spawn(move || {
///             let mut block = pool.acquire().unwrap();
///             block.fill(0);
///             pool.release(block).unwrap();
///         })
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(pool.outstanding(), 0);
/// # Ok::<(), nebula_mempool::PoolError>(())
/// ```
pub struct SharedBlockPool<A: Allocator = SystemAllocator> {
    inner: Mutex<BlockPool<A>>,
}

impl SharedBlockPool<SystemAllocator> {
    /// Create a shared pool of `block_size`-byte blocks caching up to `capacity`
    pub fn new(block_size: usize, capacity: usize) -> PoolResult<Self> {
        Ok(Self::from_pool(BlockPool::new(block_size, capacity)?))
    }

    /// Create shared pool with custom configuration
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        Ok(Self::from_pool(BlockPool::with_config(config)?))
    }
}

impl<A: Allocator> SharedBlockPool<A> {
    /// Wrap an existing pool
    pub fn from_pool(pool: BlockPool<A>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// See [`BlockPool::acquire`]
    pub fn acquire(&self) -> PoolResult<Block> {
        self.inner.lock().acquire()
    }

    /// See [`BlockPool::release`]
    pub fn release(&self, block: Block) -> PoolResult<()> {
        self.inner.lock().release(block)
    }

    /// See [`BlockPool::prewarm`]
    pub fn prewarm(&self, count: usize) -> PoolResult<usize> {
        self.inner.lock().prewarm(count)
    }

    /// See [`BlockPool::shrink_to`]
    pub fn shrink_to(&self, len: usize) -> usize {
        self.inner.lock().shrink_to(len)
    }

    /// Number of blocks currently lent out
    pub fn outstanding(&self) -> usize {
        self.inner.lock().outstanding()
    }

    /// Number of idle blocks currently cached
    pub fn cached(&self) -> usize {
        self.inner.lock().cached()
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the pool
    pub fn with_pool<R>(&self, f: impl FnOnce(&BlockPool<A>) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Unwrap the pool
    pub fn into_inner(self) -> BlockPool<A> {
        self.inner.into_inner()
    }

    /// See [`BlockPool::destroy`]
    pub fn destroy(self) -> Result<(), DestroyError<A>> {
        self.into_inner().destroy()
    }
}
