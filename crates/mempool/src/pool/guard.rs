//! RAII guard for pool blocks
//!
//! # Safety
//!
//! - `ManuallyDrop` keeps the block alive until the guard decides its fate
//! - `Drop` takes the block exactly once and releases it to the pool
//! - `detach` takes the block exactly once and skips `Drop`

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use super::BlockPool;
use crate::allocator::Allocator;
use crate::block::Block;

/// Block that returns to its pool when dropped
///
/// Borrowing the pool ties the guard's lifetime to it, so a pool can never be
/// destroyed while a guard is alive.
pub struct PooledBlock<'a, A: Allocator> {
    block: ManuallyDrop<Block>,
    pool: &'a BlockPool<A>,
}

impl<'a, A: Allocator> PooledBlock<'a, A> {
    pub(crate) fn new(block: Block, pool: &'a BlockPool<A>) -> Self {
        Self {
            block: ManuallyDrop::new(block),
            pool,
        }
    }

    /// Take the block, preventing return to pool
    ///
    /// The block still counts as outstanding; hand it to
    /// [`BlockPool::release`] when done.
    pub fn detach(self) -> Block {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the block is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.block) }
    }

    /// Pool this block will return to
    pub fn pool(&self) -> &'a BlockPool<A> {
        self.pool
    }
}

impl<A: Allocator> Deref for PooledBlock<'_, A> {
    type Target = Block;

    fn deref(&self) -> &Self::Target {
        &self.block
    }
}

impl<A: Allocator> DerefMut for PooledBlock<'_, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.block
    }
}

impl<A: Allocator> Drop for PooledBlock<'_, A> {
    fn drop(&mut self) {
        // SAFETY: drop runs once and the block is not touched afterwards.
        let block = unsafe { ManuallyDrop::take(&mut self.block) };
        // Only fails if the caller released extra blocks by hand; that path
        // already logs the violation.
        let _ = self.pool.release(block);
    }
}

#[cfg(test)]
mod tests {
    use crate::BlockPool;

    #[test]
    fn test_guard_returns_block() {
        let pool = BlockPool::new(64, 4).unwrap();
        let id = {
            let mut block = pool.get().unwrap();
            block.fill(1);
            assert_eq!(pool.outstanding(), 1);
            block.id()
        };

        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.cached(), 1);

        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), id);
        pool.release(again).unwrap();
    }

    #[test]
    fn test_detach_keeps_block_outstanding() {
        let pool = BlockPool::new(64, 4).unwrap();
        let guard = pool.get().unwrap();
        assert!(core::ptr::eq(guard.pool(), &pool));

        let block = guard.detach();
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.cached(), 0);

        pool.release(block).unwrap();
        assert_eq!(pool.cached(), 1);
    }

    #[test]
    fn test_multiple_guards() {
        let pool = BlockPool::new(32, 2).unwrap();
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        let c = pool.get().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.outstanding(), 3);

        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.cached(), 2);
        assert_eq!(pool.stats().evicted, 1);
    }
}
