//! Block pool implementation
//!
//! A bounded LIFO cache of equally sized blocks in front of an
//! [`Allocator`](crate::allocator::Allocator).
//!
//! ## Modules
//! - `block_pool` - Main BlockPool implementation (create/acquire/release/destroy)
//! - `config` - Configuration and presets
//! - `guard` - RAII guard returning blocks on drop
//! - `stack` - Fixed-capacity bookkeeping stack
//! - `stats` - Statistics tracking types
//! - `thread_safe` - Mutex wrapper for sharing one pool across threads

mod block_pool;
mod config;
mod guard;
mod stack;
mod stats;
mod thread_safe;

pub use block_pool::{BlockPool, DestroyError};
pub use config::{DEFAULT_BLOCK_ALIGN, DEFAULT_BLOCK_SIZE, DEFAULT_CAPACITY, PoolConfig};
pub use guard::PooledBlock;
pub use stats::PoolStats;
pub use thread_safe::SharedBlockPool;
