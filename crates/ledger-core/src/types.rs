// ledger-core/src/types.rs

use crate::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base units per whole token (18 decimal places, wei-style)
pub const TOKEN_SCALE: u128 = 1_000_000_000_000_000_000;

/// Unsigned token quantity in base units.
///
/// All mutating arithmetic at call sites goes through the checked
/// constructors; a `None` result is a fatal arithmetic fault for the
/// operation that produced it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Whole tokens scaled to base units (1 token = 10^18 base units)
    pub const fn from_tokens(tokens: u64) -> Self {
        Self(tokens as u128 * TOKEN_SCALE)
    }

    pub const fn inner(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(&self, other: Amount) -> Option<Amount> {
        self.0.checked_mul(other.0).map(Amount)
    }

    pub fn min(self, other: Amount) -> Amount {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque 20-byte account identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Address([u8; 20]);

impl Address {
    /// Create address from bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    /// The unrecoverable sink used to lock the minimum-liquidity shares.
    /// No keypair maps to this address.
    pub const fn burn() -> Self {
        let mut bytes = [0u8; 20];
        bytes[18] = 0xde;
        bytes[19] = 0xad;
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> LedgerResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| LedgerError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(LedgerError::InvalidAddress("invalid length".into()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
