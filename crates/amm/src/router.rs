// amm/src/router.rs

//! Stateless user-facing facade.
//!
//! The router validates user intent, moves assets between the caller
//! and the pool, and relays the pool's output back. It holds no
//! financial state of its own: every operation re-reads live reserves
//! from the pool.
//!
//! Validation runs quote-then-verify: slippage bounds, liquidity
//! limits, balances, and allowances are all checked before any funds
//! move, so a losing or under-funded call never partially executes.

use crate::constants::SPOT_UNIT;
use crate::pool::Pool;
use crate::{math, AmmError, AmmResult};
use fungible::{FungibleToken, TokenError};
use ledger_core::{Address, Amount, NativeLedger};

/// Stateless coordinator between callers and the pool.
#[derive(Debug)]
pub struct Router {
    address: Address,
    pool: Address,
}

impl Router {
    /// Create the router and register its account against plain native
    /// transfers (no implicit wrapping).
    pub fn new(address: Address, pool: &Pool, native: &mut NativeLedger) -> Self {
        native.register_contract(address);
        Self {
            address,
            pool: pool.address(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deposit a native/asset pair and mint shares to the caller.
    ///
    /// The caller attaches `native_attached` atomically with the call
    /// but can only pre-approve the asset side, so native is the side
    /// trimmed down to match the reserve ratio and the unused remainder
    /// is refunded immediately; the asset side is pulled only in the
    /// determined amount, never refunded.
    pub fn add_liquidity(
        &self,
        pool: &mut Pool,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        caller: Address,
        asset_desired: Amount,
        native_attached: Amount,
    ) -> AmmResult<Amount> {
        debug_assert_eq!(pool.address(), self.pool);
        if native_attached.is_zero() || asset_desired.is_zero() {
            return Err(AmmError::InsufficientDeposit);
        }

        let (reserve_native, reserve_asset) = pool.get_reserves();
        let (use_native, use_asset) = if reserve_native.is_zero() && reserve_asset.is_zero() {
            // First deposit establishes the price
            (native_attached, asset_desired)
        } else {
            self.ideal_deposit_ratio(pool, native_attached, asset_desired)?
        };

        // Everything the call will do is validated before funds move.
        self.require_native_balance(native, &caller, native_attached)?;
        self.require_asset_pull(asset, &caller, use_asset)?;
        pool.preview_mint(use_native, use_asset)?;

        native.transfer_for_call(caller, self.address, native_attached)?;
        let refund = native_attached
            .checked_sub(use_native)
            .ok_or(AmmError::Overflow("refund underflow"))?;
        if !refund.is_zero() {
            native.transfer_for_call(self.address, caller, refund)?;
        }
        native.transfer_for_call(self.address, self.pool, use_native)?;
        asset.transfer_from(self.address, caller, self.pool, use_asset)?;

        let shares = pool.mint(native, asset, caller)?;
        tracing::info!(%caller, %use_native, %use_asset, %refund, %shares, "liquidity added");
        Ok(shares)
    }

    /// Ideal paired amounts for a deposit against current reserves.
    ///
    /// Returns `(ideal_native, ideal_asset)`. The matching asset for
    /// the attached native is `native * reserve_asset / reserve_native`;
    /// when that exceeds the desired asset, the native side is trimmed
    /// from the asset side instead and capped by what was attached.
    pub fn ideal_deposit_ratio(
        &self,
        pool: &Pool,
        native_attached: Amount,
        asset_desired: Amount,
    ) -> AmmResult<(Amount, Amount)> {
        let (reserve_native, reserve_asset) = pool.get_reserves();
        let ideal_asset = math::quote_no_fee(native_attached, reserve_native, reserve_asset)?;
        if ideal_asset <= asset_desired {
            Ok((native_attached, ideal_asset))
        } else {
            let ideal_native = math::quote_no_fee(asset_desired, reserve_asset, reserve_native)?;
            Ok((math::min(native_attached, ideal_native), asset_desired))
        }
    }

    /// Burn `share_amount` of the caller's shares for a proportional
    /// cut of both reserves. Requires prior share approval for the
    /// router.
    pub fn remove_liquidity(
        &self,
        pool: &mut Pool,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        caller: Address,
        share_amount: Amount,
    ) -> AmmResult<(Amount, Amount)> {
        debug_assert_eq!(pool.address(), self.pool);
        if share_amount.is_zero() {
            return Err(AmmError::InvalidInput("zero share withdrawal"));
        }

        let approved = pool.share_allowance(&caller, &self.address);
        if approved < share_amount {
            return Err(TokenError::InsufficientAllowance {
                required: share_amount,
                approved,
            }
            .into());
        }
        let held = pool.share_balance_of(&caller);
        if held < share_amount {
            return Err(TokenError::InsufficientBalance {
                required: share_amount,
                available: held,
            }
            .into());
        }

        pool.transfer_shares_from(self.address, caller, self.pool, share_amount)?;
        let (native_out, asset_out) = pool.burn(native, asset, caller)?;
        tracing::info!(%caller, %share_amount, %native_out, %asset_out, "liquidity removed");
        Ok((native_out, asset_out))
    }

    /// Swap attached native currency for the asset, enforcing the
    /// caller's minimum output before any funds move.
    pub fn swap_native_for_asset(
        &self,
        pool: &mut Pool,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        caller: Address,
        native_attached: Amount,
        min_asset_out: Amount,
    ) -> AmmResult<Amount> {
        debug_assert_eq!(pool.address(), self.pool);
        if native_attached.is_zero() {
            return Err(AmmError::InsufficientDeposit);
        }
        let (reserve_native, reserve_asset) = pool.get_reserves();
        let quoted = self.check_swap_bounds(
            native_attached,
            reserve_native,
            reserve_asset,
            min_asset_out,
        )?;
        self.require_native_balance(native, &caller, native_attached)?;

        native.transfer_for_call(caller, self.pool, native_attached)?;
        let (_, asset_out) = pool.swap(native, asset, caller)?;
        tracing::info!(%caller, %native_attached, %asset_out, %quoted, "swapped native for asset");
        Ok(asset_out)
    }

    /// Swap a pre-approved asset amount for native currency; symmetric
    /// to [`Router::swap_native_for_asset`].
    pub fn swap_asset_for_native(
        &self,
        pool: &mut Pool,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        caller: Address,
        asset_in: Amount,
        min_native_out: Amount,
    ) -> AmmResult<Amount> {
        debug_assert_eq!(pool.address(), self.pool);
        if asset_in.is_zero() {
            return Err(AmmError::InsufficientDeposit);
        }
        let (reserve_native, reserve_asset) = pool.get_reserves();
        let quoted =
            self.check_swap_bounds(asset_in, reserve_asset, reserve_native, min_native_out)?;
        self.require_asset_pull(asset, &caller, asset_in)?;

        asset.transfer_from(self.address, caller, self.pool, asset_in)?;
        let (native_out, _) = pool.swap(native, asset, caller)?;
        tracing::info!(%caller, %asset_in, %native_out, %quoted, "swapped asset for native");
        Ok(native_out)
    }

    /// Asset units bought by one whole native token at the current
    /// reserves, fee included. Used to pick slippage bounds before
    /// submitting a trade.
    pub fn current_asset_per_native_price(&self, pool: &Pool) -> AmmResult<Amount> {
        let (reserve_native, reserve_asset) = pool.get_reserves();
        math::quote_with_fee(Amount::new(SPOT_UNIT), reserve_native, reserve_asset)
    }

    /// Native units bought by one whole asset token, fee included.
    pub fn current_native_per_asset_price(&self, pool: &Pool) -> AmmResult<Amount> {
        let (reserve_native, reserve_asset) = pool.get_reserves();
        math::quote_with_fee(Amount::new(SPOT_UNIT), reserve_asset, reserve_native)
    }

    /// Shared pre-trade checks: liquidity first, then slippage, all
    /// before any transfer.
    fn check_swap_bounds(
        &self,
        amount_in: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
        min_out: Amount,
    ) -> AmmResult<Amount> {
        if min_out > reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: min_out,
                available: reserve_out,
            });
        }
        let quoted = math::quote_with_fee(amount_in, reserve_in, reserve_out)?;
        if quoted >= reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: quoted,
                available: reserve_out,
            });
        }
        if quoted < min_out {
            return Err(AmmError::SlippageExceeded {
                quoted,
                minimum: min_out,
            });
        }
        Ok(quoted)
    }

    fn require_native_balance(
        &self,
        native: &NativeLedger,
        caller: &Address,
        amount: Amount,
    ) -> AmmResult<()> {
        let available = native.balance_of(caller);
        if available < amount {
            return Err(ledger_core::LedgerError::InsufficientBalance {
                required: amount,
                available,
            }
            .into());
        }
        Ok(())
    }

    fn require_asset_pull(
        &self,
        asset: &FungibleToken,
        caller: &Address,
        amount: Amount,
    ) -> AmmResult<()> {
        let approved = asset.allowance(caller, &self.address);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                required: amount,
                approved,
            }
            .into());
        }
        let available = asset.balance_of(caller);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                required: amount,
                available,
            }
            .into());
        }
        Ok(())
    }
}
