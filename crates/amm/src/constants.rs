// amm/src/constants.rs

//! Fixed engine constants.
//!
//! There is no governance path to change any of these, so they are
//! compile-time constants rather than configuration.

use ledger_core::TOKEN_SCALE;

/// Swap fee taken from the input amount: 10/1000 = 1%
pub const FEE_NUMERATOR: u128 = 10;

/// Fee denominator (per-mille basis)
pub const FEE_DENOMINATOR: u128 = 1_000;

/// Share units locked forever at the first deposit. Prevents
/// share-price manipulation via a near-zero initial deposit.
pub const MINIMUM_LIQUIDITY: u128 = 10_000;

/// Notional one-whole-token input used for spot-price quotes.
pub const SPOT_UNIT: u128 = TOKEN_SCALE;
