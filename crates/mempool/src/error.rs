//! Error types for nebula-mempool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions. The pool has
//! exactly two failure classes: broken caller contracts and allocator
//! exhaustion. Construction additionally rejects invalid configuration.

use core::alloc::Layout;
use core::fmt;

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Contract violations
// ============================================================================

/// Pool usage contract that a caller broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// `release` was called while no block was lent out
    NoOutstandingBlocks,
    /// `destroy` was called while blocks were still lent out
    OutstandingOnDestroy {
        /// Blocks still held by callers
        outstanding: usize,
    },
    /// `release` was given a block this pool cannot have handed out
    ForeignBlock {
        /// Length of the offered block
        len: usize,
        /// Block size of the pool
        block_size: usize,
    },
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOutstandingBlocks => f.write_str("release called with no outstanding blocks"),
            Self::OutstandingOnDestroy { outstanding } => {
                write!(f, "destroy called with {outstanding} outstanding block(s)")
            }
            Self::ForeignBlock { len, block_size } => write!(
                f,
                "released block of {len} bytes does not fit pool of {block_size}-byte blocks"
            ),
        }
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Block pool errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool contract violation: {0}")]
    ContractViolation(Contract),

    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error("Invalid pool configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl PoolError {
    /// Create contract violation error
    pub fn contract_violation(contract: Contract) -> Self {
        #[cfg(feature = "logging")]
        warn!(%contract, "block pool contract violated");

        Self::ContractViolation(contract)
    }

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, align, "block allocation failed");

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContractViolation(Contract::NoOutstandingBlocks) => {
                "POOL:CONTRACT:NO_OUTSTANDING"
            }
            Self::ContractViolation(Contract::OutstandingOnDestroy { .. }) => {
                "POOL:CONTRACT:OUTSTANDING_ON_DESTROY"
            }
            Self::ContractViolation(Contract::ForeignBlock { .. }) => {
                "POOL:CONTRACT:FOREIGN_BLOCK"
            }
            Self::AllocationFailed { .. } => "POOL:ALLOC:FAILED",
            Self::InvalidConfig { .. } => "POOL:CONFIG:INVALID",
        }
    }

    /// Check if this error is a caller contract violation
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }

    /// The broken contract, if this is a contract violation
    #[must_use]
    pub fn contract(&self) -> Option<Contract> {
        match self {
            Self::ContractViolation(contract) => Some(*contract),
            _ => None,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
