// amm/src/math.rs

//! Pure integer math helpers.
//!
//! No state. Intermediate products are widened through `BigUint` so a
//! `u128 * u128` never wraps; any final value that does not fit back
//! into `u128` is a hard arithmetic fault.

use crate::constants::{FEE_DENOMINATOR, FEE_NUMERATOR};
use crate::{AmmError, AmmResult};
use ledger_core::Amount;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// Integer square root via the Babylonian iteration, terminating when
/// the estimate stops decreasing. `sqrt(0) == 0`.
pub fn sqrt(n: &BigUint) -> AmmResult<Amount> {
    if n.is_zero() {
        return Ok(Amount::zero());
    }
    let mut estimate = (n + 1u32) / 2u32;
    let mut root = n.clone();
    while estimate < root {
        root = estimate.clone();
        estimate = (n / &estimate + &estimate) / 2u32;
    }
    root.to_u128()
        .map(Amount::new)
        .ok_or(AmmError::Overflow("square root exceeds 128 bits"))
}

/// Smaller of two amounts.
pub fn min(a: Amount, b: Amount) -> Amount {
    a.min(b)
}

/// `a * b / divisor` with the product widened through `BigUint`.
pub fn mul_div(a: Amount, b: Amount, divisor: Amount) -> AmmResult<Amount> {
    if divisor.is_zero() {
        return Err(AmmError::InvalidInput("division by zero"));
    }
    let product = BigUint::from(a.inner()) * BigUint::from(b.inner());
    let quotient = product / BigUint::from(divisor.inner());
    quotient
        .to_u128()
        .map(Amount::new)
        .ok_or(AmmError::Overflow("quotient exceeds 128 bits"))
}

/// Proportional return without fee: `amount_in * reserve_out / reserve_in`.
///
/// Used only for ratio calculations during deposits, where no fee is
/// charged. A zero input or zero reserve has no well-defined price.
pub fn quote_no_fee(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> AmmResult<Amount> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InvalidInput("zero amount or reserve in quote"));
    }
    mul_div(amount_in, reserve_out, reserve_in)
}

/// Constant-product return with the 1% fee taken from the input:
/// `net = amount_in * 990 / 1000`, then
/// `amount_out = net * reserve_out / (reserve_in + net)`.
///
/// This is the quote used for all real swaps.
pub fn quote_with_fee(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> AmmResult<Amount> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InvalidInput("zero amount or reserve in quote"));
    }
    let net = mul_div(
        amount_in,
        Amount::new(FEE_DENOMINATOR - FEE_NUMERATOR),
        Amount::new(FEE_DENOMINATOR),
    )?;
    if net.is_zero() {
        return Err(AmmError::InvalidInput("input too small after fee"));
    }
    let denominator = reserve_in
        .checked_add(net)
        .ok_or(AmmError::Overflow("reserve plus net input overflow"))?;
    mul_div(net, reserve_out, denominator)
}
