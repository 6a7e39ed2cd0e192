//! # nebula-mempool
//!
//! Fixed-size block recycling for hot paths such as per-connection buffers in
//! a gateway.
//!
//! A [`BlockPool`] hands out equally sized blocks and takes them back, keeping
//! up to `capacity` idle blocks in a LIFO cache so the most recently released
//! (and most likely cache-warm) memory is reused first. Misses and overflow go
//! to an [`Allocator`].
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_mempool::prelude::*;
//!
//! let pool = BlockPool::new(4096, 64)?;
//!
//! // Explicit hand-off
//! let mut block = pool.acquire()?;
//! block.fill(0);
//! pool.release(block)?;
//!
//! // Or let a guard return the block
//! {
//!     let mut buf = pool.get()?;
//!     buf.fill(b' ');
//! }
//!
//! assert_eq!(pool.outstanding(), 0);
//! pool.destroy().map_err(|e| e.into_error())?;
//! # Ok::<(), PoolError>(())
//! ```
//!
//! ## Contracts
//!
//! `release` with nothing outstanding and `destroy` with blocks still lent out
//! are caller bugs. They surface as [`PoolError::ContractViolation`] instead of
//! aborting; a rejected `destroy` hands the pool back.
//!
//! ## Threading
//!
//! `BlockPool` is `Send` but not `Sync`: give each worker its own pool, or
//! share one through [`SharedBlockPool`].
//!
//! ## Features
//!
//! - `logging` (default): lifecycle and contract-violation events via `tracing`
//! - `serde`: `Serialize`/`Deserialize` for [`PoolConfig`]

#![cfg_attr(docsrs, feature(doc_cfg))]
// Raw block memory is the point of this crate
#![allow(unsafe_code)]

pub mod allocator;
pub mod block;
pub mod error;
pub mod pool;

pub use crate::allocator::{Allocator, SystemAllocator, TrackedAllocator};
pub use crate::block::{Block, BlockId};
pub use crate::error::{Contract, PoolError, PoolResult};
pub use crate::pool::{
    BlockPool, DEFAULT_CAPACITY, DestroyError, PoolConfig, PoolStats, PooledBlock,
    SharedBlockPool,
};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::allocator::{Allocator, SystemAllocator};
    pub use crate::block::{Block, BlockId};
    pub use crate::error::{Contract, PoolError, PoolResult};
    pub use crate::pool::{BlockPool, PoolConfig, PoolStats, PooledBlock, SharedBlockPool};
}
