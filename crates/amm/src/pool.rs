// amm/src/pool.rs

//! Reserve-holding constant-product pool.
//!
//! The pool tracks `reserve_native` / `reserve_asset`, mints and burns
//! proportional shares through a composed [`FungibleToken`] ledger, and
//! executes the low-level swap primitive. It is the sole source of
//! truth for reserves and share supply.
//!
//! Deposits follow the transfer-then-call pattern: the caller moves
//! assets to the pool account first, then invokes `mint`/`swap`; the
//! pool reads its actual held balances and treats the diff against the
//! tracked reserves as the deposit. Reserves are updated only through
//! `sync` at the end of each state-changing operation.

use crate::constants::{FEE_DENOMINATOR, FEE_NUMERATOR, MINIMUM_LIQUIDITY};
use crate::{math, AmmError, AmmResult};
use fungible::FungibleToken;
use ledger_core::{Address, Amount, NativeLedger};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Record of a state-changing pool operation, kept for off-chain
/// indexing. Not consumed internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Mint {
        recipient: Address,
        native_in: Amount,
        asset_in: Amount,
        shares: Amount,
    },
    Burn {
        recipient: Address,
        native_out: Amount,
        asset_out: Amount,
        shares: Amount,
    },
    Swap {
        recipient: Address,
        native_in: Amount,
        asset_in: Amount,
        native_out: Amount,
        asset_out: Amount,
    },
}

/// Single mutable lock flag guarding every state-changing entry point.
///
/// Acquisition hands back an RAII guard; the flag clears when the guard
/// drops, so a failed call can never leave the pool permanently locked.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyLock {
    held: Rc<Cell<bool>>,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> AmmResult<LockGuard> {
        if self.held.get() {
            return Err(AmmError::ReentrantCall);
        }
        self.held.set(true);
        Ok(LockGuard {
            held: Rc::clone(&self.held),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

/// Guard returned by [`ReentrancyLock::acquire`]; releases on drop.
#[derive(Debug)]
pub struct LockGuard {
    held: Rc<Cell<bool>>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.held.set(false);
    }
}

/// Two-asset constant-product pool with a proportional share ledger.
#[derive(Debug)]
pub struct Pool {
    address: Address,
    reserve_native: Amount,
    reserve_asset: Amount,
    shares: FungibleToken,
    lock: ReentrancyLock,
    events: Vec<PoolEvent>,
}

impl Pool {
    /// Create the pool and register its account against plain native
    /// transfers: all native inflow must arrive via a mint/swap call.
    pub fn new(address: Address, native: &mut NativeLedger) -> Self {
        native.register_contract(address);
        Self {
            address,
            reserve_native: Amount::zero(),
            reserve_asset: Amount::zero(),
            shares: FungibleToken::new(),
            lock: ReentrancyLock::new(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Read-only reserve snapshot.
    pub fn get_reserves(&self) -> (Amount, Amount) {
        (self.reserve_native, self.reserve_asset)
    }

    pub fn total_shares(&self) -> Amount {
        self.shares.total_supply()
    }

    pub fn share_balance_of(&self, owner: &Address) -> Amount {
        self.shares.balance_of(owner)
    }

    pub fn share_allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.shares.allowance(owner, spender)
    }

    pub fn approve_shares(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.shares.approve(owner, spender, amount);
    }

    pub fn transfer_shares(&mut self, from: Address, to: Address, amount: Amount) -> AmmResult<()> {
        self.shares.transfer(from, to, amount)?;
        Ok(())
    }

    pub fn transfer_shares_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> AmmResult<()> {
        self.shares.transfer_from(spender, owner, to, amount)?;
        Ok(())
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Issue shares against assets already transferred in.
    ///
    /// The deposit is the diff between actual held balances and the
    /// tracked reserves. The first deposit issues
    /// `sqrt(native_in * asset_in) - MINIMUM_LIQUIDITY` to the
    /// recipient and locks `MINIMUM_LIQUIDITY` shares at the burn
    /// address; later deposits issue the smaller of the two
    /// proportional ratios, so a lopsided deposit donates its excess
    /// side to existing holders.
    pub fn mint(
        &mut self,
        native: &NativeLedger,
        asset: &FungibleToken,
        recipient: Address,
    ) -> AmmResult<Amount> {
        let _guard = self.lock.acquire()?;

        let (native_in, asset_in) = self.deposit_diff(native, asset)?;
        let first_deposit = self.shares.total_supply().is_zero();
        let issued = self.preview_mint(native_in, asset_in)?;

        if first_deposit {
            self.shares
                .mint(Address::burn(), Amount::new(MINIMUM_LIQUIDITY))?;
        }
        self.shares.mint(recipient, issued)?;
        self.sync(native, asset);

        tracing::info!(%recipient, %native_in, %asset_in, %issued, "pool mint");
        self.events.push(PoolEvent::Mint {
            recipient,
            native_in,
            asset_in,
            shares: issued,
        });
        Ok(issued)
    }

    /// Shares a given deposit would issue against current reserves.
    ///
    /// Read-only twin of the issuance arithmetic in [`Pool::mint`];
    /// the router uses it to reject a too-small deposit before any
    /// funds move.
    pub fn preview_mint(&self, native_in: Amount, asset_in: Amount) -> AmmResult<Amount> {
        let issued = if self.shares.total_supply().is_zero() {
            let product = BigUint::from(native_in.inner()) * BigUint::from(asset_in.inner());
            let root = math::sqrt(&product)?;
            root.checked_sub(Amount::new(MINIMUM_LIQUIDITY))
                .ok_or(AmmError::DepositAmountTooLow)?
        } else {
            let total = self.shares.total_supply();
            let by_native = math::mul_div(native_in, total, self.reserve_native)?;
            let by_asset = math::mul_div(asset_in, total, self.reserve_asset)?;
            math::min(by_native, by_asset)
        };
        if issued.is_zero() {
            return Err(AmmError::DepositAmountTooLow);
        }
        Ok(issued)
    }

    /// Pay out both reserves against shares previously transferred to
    /// the pool's own account, burning those shares.
    ///
    /// The payout ratio exactly matches the current reserve ratio, so
    /// the withdrawal is immune to temporary price distortion.
    pub fn burn(
        &mut self,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        recipient: Address,
    ) -> AmmResult<(Amount, Amount)> {
        let _guard = self.lock.acquire()?;

        let held = self.shares.balance_of(&self.address);
        if held.is_zero() {
            return Err(AmmError::DepositAmountTooLow);
        }
        let total = self.shares.total_supply();
        let native_out = math::mul_div(held, self.reserve_native, total)?;
        let asset_out = math::mul_div(held, self.reserve_asset, total)?;

        self.shares.burn(self.address, held)?;
        native.transfer_for_call(self.address, recipient, native_out)?;
        asset.transfer(self.address, recipient, asset_out)?;
        self.sync(native, asset);

        tracing::info!(%recipient, %native_out, %asset_out, shares = %held, "pool burn");
        self.events.push(PoolEvent::Burn {
            recipient,
            native_out,
            asset_out,
            shares: held,
        });
        Ok((native_out, asset_out))
    }

    /// Low-level swap primitive. Trusts the caller (the router) to have
    /// transferred exactly one input asset in beforehand; slippage
    /// bounds live at the router layer.
    ///
    /// Verifies before paying out that the fee-adjusted product of the
    /// post-swap balances does not fall below the prior invariant, so
    /// an accounting error can never leak value.
    ///
    /// Returns `(native_out, asset_out)`; exactly one side is non-zero.
    pub fn swap(
        &mut self,
        native: &mut NativeLedger,
        asset: &mut FungibleToken,
        recipient: Address,
    ) -> AmmResult<(Amount, Amount)> {
        let _guard = self.lock.acquire()?;

        let (native_in, asset_in) = self.deposit_diff(native, asset)?;
        let (native_out, asset_out) = match (native_in.is_zero(), asset_in.is_zero()) {
            (true, true) => return Err(AmmError::DepositAmountTooLow),
            (false, false) => {
                return Err(AmmError::InvalidInput("one-sided swap input expected"))
            }
            // Native in, asset out
            (false, true) => {
                let out =
                    math::quote_with_fee(native_in, self.reserve_native, self.reserve_asset)?;
                (Amount::zero(), out)
            }
            // Asset in, native out
            (true, false) => {
                let out =
                    math::quote_with_fee(asset_in, self.reserve_asset, self.reserve_native)?;
                (out, Amount::zero())
            }
        };
        let out = native_out.checked_add(asset_out).ok_or(AmmError::Overflow(
            "swap output overflow",
        ))?;
        if out.is_zero() {
            return Err(AmmError::DepositAmountTooLow);
        }
        let reserve_out = if asset_out.is_zero() {
            self.reserve_native
        } else {
            self.reserve_asset
        };
        if out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: out,
                available: reserve_out,
            });
        }

        self.check_invariant(native, asset, native_in, asset_in, native_out, asset_out)?;

        if !asset_out.is_zero() {
            asset.transfer(self.address, recipient, asset_out)?;
        } else {
            native.transfer_for_call(self.address, recipient, native_out)?;
        }
        self.sync(native, asset);

        tracing::info!(
            %recipient, %native_in, %asset_in, %native_out, %asset_out, "pool swap"
        );
        self.events.push(PoolEvent::Swap {
            recipient,
            native_in,
            asset_in,
            native_out,
            asset_out,
        });
        Ok((native_out, asset_out))
    }

    /// Diff actual held balances against tracked reserves. Negative
    /// diffs mean the bookkeeping no longer covers the holdings, which
    /// is an accounting fault.
    fn deposit_diff(
        &self,
        native: &NativeLedger,
        asset: &FungibleToken,
    ) -> AmmResult<(Amount, Amount)> {
        let native_in = native
            .balance_of(&self.address)
            .checked_sub(self.reserve_native)
            .ok_or(AmmError::Overflow("held native below tracked reserve"))?;
        let asset_in = asset
            .balance_of(&self.address)
            .checked_sub(self.reserve_asset)
            .ok_or(AmmError::Overflow("held asset below tracked reserve"))?;
        Ok((native_in, asset_in))
    }

    /// Fee-adjusted product check: with balances scaled by the fee
    /// denominator and the fee share of the input deducted, the new
    /// product must not fall below the prior `k`.
    fn check_invariant(
        &self,
        native: &NativeLedger,
        asset: &FungibleToken,
        native_in: Amount,
        asset_in: Amount,
        native_out: Amount,
        asset_out: Amount,
    ) -> AmmResult<()> {
        let native_after = native
            .balance_of(&self.address)
            .checked_sub(native_out)
            .ok_or(AmmError::Overflow("native payout exceeds holdings"))?;
        let asset_after = asset
            .balance_of(&self.address)
            .checked_sub(asset_out)
            .ok_or(AmmError::Overflow("asset payout exceeds holdings"))?;

        let adjusted_native = BigUint::from(native_after.inner()) * FEE_DENOMINATOR
            - BigUint::from(native_in.inner()) * FEE_NUMERATOR;
        let adjusted_asset = BigUint::from(asset_after.inner()) * FEE_DENOMINATOR
            - BigUint::from(asset_in.inner()) * FEE_NUMERATOR;
        let k_after = adjusted_native * adjusted_asset;
        let k_before = BigUint::from(self.reserve_native.inner())
            * BigUint::from(self.reserve_asset.inner())
            * FEE_DENOMINATOR
            * FEE_DENOMINATOR;

        if k_after < k_before {
            return Err(AmmError::InvariantViolation {
                before: k_before.to_string(),
                after: k_after.to_string(),
            });
        }
        Ok(())
    }

    /// Align tracked reserves with actual held balances. Called only at
    /// the end of mint/burn/swap.
    fn sync(&mut self, native: &NativeLedger, asset: &FungibleToken) {
        self.reserve_native = native.balance_of(&self.address);
        self.reserve_asset = asset.balance_of(&self.address);
        tracing::debug!(
            reserve_native = %self.reserve_native,
            reserve_asset = %self.reserve_asset,
            "reserves synced"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MINIMUM_LIQUIDITY;

    fn addr(tag: u8) -> Address {
        Address::new([tag; 20])
    }

    fn tokens(n: u64) -> Amount {
        Amount::from_tokens(n)
    }

    struct Fixture {
        native: NativeLedger,
        asset: FungibleToken,
        pool: Pool,
        alice: Address,
        bob: Address,
    }

    fn setup() -> Fixture {
        let mut native = NativeLedger::new();
        let mut asset = FungibleToken::new();
        let alice = addr(1);
        let bob = addr(2);
        native.credit(alice, tokens(1_000)).unwrap();
        native.credit(bob, tokens(1_000)).unwrap();
        asset.mint(alice, tokens(1_000)).unwrap();
        asset.mint(bob, tokens(1_000)).unwrap();
        let pool = Pool::new(addr(0xF0), &mut native);
        Fixture {
            native,
            asset,
            pool,
            alice,
            bob,
        }
    }

    /// Push a deposit into the pool the way the router would, then mint.
    fn deposit(f: &mut Fixture, from: Address, native_in: Amount, asset_in: Amount) -> Amount {
        if !native_in.is_zero() {
            f.native
                .transfer_for_call(from, f.pool.address(), native_in)
                .unwrap();
        }
        if !asset_in.is_zero() {
            f.asset.transfer(from, f.pool.address(), asset_in).unwrap();
        }
        f.pool.mint(&f.native, &f.asset, from).unwrap()
    }

    #[test]
    fn test_first_deposit_locks_minimum_liquidity() {
        let mut f = setup();
        let alice = f.alice;
        let shares = deposit(&mut f, alice, tokens(10), tokens(50));

        let product = BigUint::from(tokens(10).inner()) * BigUint::from(tokens(50).inner());
        let root = math::sqrt(&product).unwrap();
        assert_eq!(
            shares,
            root.checked_sub(Amount::new(MINIMUM_LIQUIDITY)).unwrap()
        );
        assert_eq!(
            f.pool.share_balance_of(&Address::burn()),
            Amount::new(MINIMUM_LIQUIDITY)
        );
        assert_eq!(f.pool.total_shares(), root);
        assert_eq!(f.pool.get_reserves(), (tokens(10), tokens(50)));

        match f.pool.events().last().unwrap() {
            PoolEvent::Mint {
                native_in,
                asset_in,
                shares: issued,
                ..
            } => {
                assert_eq!(*native_in, tokens(10));
                assert_eq!(*asset_in, tokens(50));
                assert_eq!(*issued, shares);
            }
            other => panic!("expected mint event, got {other:?}"),
        }
    }

    #[test]
    fn test_first_deposit_below_minimum_rejected() {
        let mut f = setup();
        f.native
            .transfer_for_call(f.alice, f.pool.address(), Amount::new(50))
            .unwrap();
        f.asset
            .transfer(f.alice, f.pool.address(), Amount::new(50))
            .unwrap();
        // sqrt(2500) = 50 < MINIMUM_LIQUIDITY
        let err = f.pool.mint(&f.native, &f.asset, f.alice).unwrap_err();
        assert!(matches!(err, AmmError::DepositAmountTooLow));
        // Nothing was issued
        assert!(f.pool.total_shares().is_zero());
        assert!(f.pool.share_balance_of(&Address::burn()).is_zero());
    }

    #[test]
    fn test_proportional_second_deposit() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let total_before = f.pool.total_shares();

        // 10% of each reserve should issue 10% of outstanding shares
        let bob = f.bob;
        let bob_shares = deposit(&mut f, bob, tokens(1), tokens(5));
        assert_eq!(
            bob_shares,
            math::mul_div(total_before, Amount::new(1), Amount::new(10)).unwrap()
        );
        assert_eq!(f.pool.get_reserves(), (tokens(11), tokens(55)));
    }

    #[test]
    fn test_lopsided_deposit_credits_smaller_side() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let total_before = f.pool.total_shares();

        // Asset side proposes 20%, native side only 10%
        let bob = f.bob;
        let bob_shares = deposit(&mut f, bob, tokens(1), tokens(10));
        assert_eq!(
            bob_shares,
            math::mul_div(total_before, Amount::new(1), Amount::new(10)).unwrap()
        );
        // The excess asset is absorbed into reserves for existing holders
        assert_eq!(f.pool.get_reserves(), (tokens(11), tokens(60)));
    }

    #[test]
    fn test_mint_without_deposit_rejected_and_lock_released() {
        let mut f = setup();
        let err = f.pool.mint(&f.native, &f.asset, f.alice).unwrap_err();
        assert!(matches!(err, AmmError::DepositAmountTooLow));

        // The failed call released the lock; a valid mint succeeds
        let alice = f.alice;
        let shares = deposit(&mut f, alice, tokens(10), tokens(50));
        assert!(!shares.is_zero());
    }

    #[test]
    fn test_burn_pays_proportionally() {
        let mut f = setup();
        let alice = f.alice;
        let shares = deposit(&mut f, alice, tokens(10), tokens(50));

        let native_before = f.native.balance_of(&alice);
        let asset_before = f.asset.balance_of(&alice);

        // Transfer shares into the pool, then burn
        f.pool
            .transfer_shares(alice, f.pool.address(), shares)
            .unwrap();
        let (native_out, asset_out) = f
            .pool
            .burn(&mut f.native, &mut f.asset, alice)
            .unwrap();

        // Round trip never returns more than deposited: the locked
        // minimum-liquidity shares stay behind.
        assert!(native_out < tokens(10));
        assert!(asset_out < tokens(50));
        assert_eq!(
            f.native.balance_of(&alice),
            native_before.checked_add(native_out).unwrap()
        );
        assert_eq!(
            f.asset.balance_of(&alice),
            asset_before.checked_add(asset_out).unwrap()
        );

        // Payout ratio equals the reserve ratio (10:50), truncation aside
        let scaled = native_out.checked_mul(Amount::new(5)).unwrap();
        let drift = scaled.inner().abs_diff(asset_out.inner());
        assert!(drift <= 5, "payout ratio drifted by {drift}");
        assert_eq!(f.pool.total_shares(), Amount::new(MINIMUM_LIQUIDITY));
    }

    #[test]
    fn test_burn_without_shares_rejected() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let bob = f.bob;
        let err = f.pool.burn(&mut f.native, &mut f.asset, bob).unwrap_err();
        assert!(matches!(err, AmmError::DepositAmountTooLow));
        assert_eq!(f.pool.get_reserves(), (tokens(10), tokens(50)));
    }

    #[test]
    fn test_swap_native_for_asset_preserves_k() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let (rn, ra) = f.pool.get_reserves();
        let k_before = BigUint::from(rn.inner()) * BigUint::from(ra.inner());

        let expected = math::quote_with_fee(tokens(1), rn, ra).unwrap();
        let bob = f.bob;
        f.native
            .transfer_for_call(bob, f.pool.address(), tokens(1))
            .unwrap();
        let (native_out, asset_out) =
            f.pool.swap(&mut f.native, &mut f.asset, bob).unwrap();

        assert!(native_out.is_zero());
        assert_eq!(asset_out, expected);

        let (rn_after, ra_after) = f.pool.get_reserves();
        assert_eq!(rn_after, tokens(11));
        let k_after = BigUint::from(rn_after.inner()) * BigUint::from(ra_after.inner());
        assert!(k_after >= k_before);
    }

    #[test]
    fn test_swap_asset_for_native() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let (rn, ra) = f.pool.get_reserves();
        let expected = math::quote_with_fee(tokens(5), ra, rn).unwrap();

        let bob = f.bob;
        f.asset.transfer(bob, f.pool.address(), tokens(5)).unwrap();
        let (native_out, asset_out) =
            f.pool.swap(&mut f.native, &mut f.asset, bob).unwrap();

        assert_eq!(native_out, expected);
        assert!(asset_out.is_zero());
        assert_eq!(f.pool.get_reserves().1, tokens(55));
    }

    #[test]
    fn test_swap_without_input_rejected() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let bob = f.bob;
        let err = f.pool.swap(&mut f.native, &mut f.asset, bob).unwrap_err();
        assert!(matches!(err, AmmError::DepositAmountTooLow));
        assert_eq!(f.pool.get_reserves(), (tokens(10), tokens(50)));
    }

    #[test]
    fn test_swap_with_both_sides_in_rejected() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let bob = f.bob;
        f.native
            .transfer_for_call(bob, f.pool.address(), tokens(1))
            .unwrap();
        f.asset.transfer(bob, f.pool.address(), tokens(1)).unwrap();
        let err = f.pool.swap(&mut f.native, &mut f.asset, bob).unwrap_err();
        assert!(matches!(err, AmmError::InvalidInput(_)));
    }

    #[test]
    fn test_pool_rejects_plain_native_transfer() {
        let mut f = setup();
        let pool_addr = f.pool.address();
        let err = f.native.send(f.alice, pool_addr, tokens(1)).unwrap_err();
        assert!(matches!(
            err,
            ledger_core::LedgerError::TransferRejected(_)
        ));
    }

    #[test]
    fn test_reentrancy_lock_guard_releases_on_drop() {
        let lock = ReentrancyLock::new();
        let guard = lock.acquire().unwrap();
        assert!(lock.is_held());
        assert!(matches!(
            lock.acquire().unwrap_err(),
            AmmError::ReentrantCall
        ));
        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.acquire().is_ok());
    }

    #[test]
    fn test_events_serialize() {
        let mut f = setup();
        let alice = f.alice;
        deposit(&mut f, alice, tokens(10), tokens(50));
        let json = serde_json::to_string(f.pool.events()).unwrap();
        assert!(json.contains("Mint"));
    }
}
