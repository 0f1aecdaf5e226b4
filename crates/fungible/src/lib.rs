// fungible/src/lib.rs

//! Fungible token balance ledger
//!
//! A balance-and-allowance mapping with authorize-then-pull transfer
//! semantics. The same type backs the externally traded asset and,
//! composed into the pool, the proportional-ownership share token.

pub mod token;

pub use token::FungibleToken;

use ledger_core::{Address, Amount};

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Errors that can occur in token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Insufficient allowance: required {required}, approved {approved}")]
    InsufficientAllowance { required: Amount, approved: Amount },

    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),

    #[error("Supply overflow")]
    SupplyOverflow,
}
