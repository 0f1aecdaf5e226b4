// amm/src/lib.rs

//! Two-asset constant-product market maker
//!
//! This crate implements the automated liquidity-pool engine:
//! - `math`: pure integer helpers (sqrt, proportional quotes)
//! - `pool`: reserve-holding pool with proportional share issuance,
//!   the low-level swap primitive, and the k-invariant check
//! - `router`: stateless user-facing facade with slippage protection
//!   and refund-on-overpayment deposits
//!
//! The pool is the sole source of truth for reserves and share supply.
//! Users interact only with the router, which moves assets between the
//! caller and the pool and relays the pool's output back.

pub mod constants;
pub mod math;
pub mod pool;
pub mod router;

pub use pool::{Pool, PoolEvent, ReentrancyLock};
pub use router::Router;

use ledger_core::Amount;

/// Result type for pool and router operations
pub type AmmResult<T> = Result<T, AmmError>;

/// Errors that can occur in pool and router operations.
///
/// Every variant aborts the whole call with no partial state change;
/// none are retriable without changed inputs.
#[derive(Debug, thiserror::Error)]
pub enum AmmError {
    /// Input validation: zero amounts or a zero reserve basis have no
    /// well-defined price and must not silently quote zero.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The deposit diff or share transfer was too small to credit.
    #[error("Deposit amount too low")]
    DepositAmountTooLow,

    /// A swap was submitted with nothing attached or pulled.
    #[error("Insufficient deposit")]
    InsufficientDeposit,

    /// Quoted output fell below the caller's minimum; checked before
    /// any funds move.
    #[error("Slippage exceeded: quoted {quoted}, minimum {minimum}")]
    SlippageExceeded { quoted: Amount, minimum: Amount },

    /// Requested output exceeds what the reserves can pay.
    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Amount,
        available: Amount,
    },

    /// The post-operation product check failed. This signals an
    /// accounting bug, not a user error.
    #[error("Invariant violation: k before {before}, after {after}")]
    InvariantViolation { before: String, after: String },

    /// Integer wraparound in reserve or share math.
    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// A state-changing entry point was re-entered mid-update.
    #[error("Reentrant call")]
    ReentrantCall,

    #[error(transparent)]
    Ledger(#[from] ledger_core::LedgerError),

    #[error(transparent)]
    Token(#[from] fungible::TokenError),
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_imports() {
        // Smoke test
    }
}
