// ledger-core/src/lib.rs

//! Shared ledger primitives
//!
//! This crate provides the value types used across the pair-pool
//! workspace:
//! - `Amount`: unsigned token quantity with checked arithmetic
//! - `Address`: opaque 20-byte account identifier
//! - `NativeLedger`: per-account native-currency balances
//!
//! All arithmetic is integer-only; out-of-range results are surfaced
//! as errors, never clamped or saturated.

pub mod native;
pub mod types;

pub use native::NativeLedger;
pub use types::{Address, Amount, TOKEN_SCALE};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Plain transfer rejected by {0}")]
    TransferRejected(Address),

    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
