// fungible/src/token.rs

use crate::{TokenError, TokenResult};
use ledger_core::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// ERC20-shaped balance ledger: balances, allowances, total supply.
///
/// Allowances are set absolutely by `approve` and decremented by
/// `transfer_from`; transfers never go below zero on any side, every
/// failure leaves all mappings untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FungibleToken {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl FungibleToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or_else(Amount::zero)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    /// Issue new units to `to`, growing total supply.
    pub fn mint(&mut self, to: Address, amount: Amount) -> TokenResult<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow(to))?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Destroy units held by `from`, shrinking total supply.
    pub fn burn(&mut self, from: Address, amount: Amount) -> TokenResult<()> {
        let balance = self.balance_of(&from);
        let debited = balance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                required: amount,
                available: balance,
            })?;
        // Supply covers every balance, so this subtraction cannot fail
        // once the balance check passed.
        let supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        self.balances.insert(from, debited);
        self.total_supply = supply;
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TokenResult<()> {
        let from_balance = self.balance_of(&from);
        let debited = from_balance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                required: amount,
                available: from_balance,
            })?;
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow(to))?;
        self.balances.insert(from, debited);
        self.balances.insert(to, credited);
        tracing::trace!(%from, %to, %amount, "token transfer");
        Ok(())
    }

    /// Authorize `spender` to pull up to `amount` from `owner`.
    /// Sets the allowance absolutely, it does not accumulate.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Pull `amount` from `owner` to `to` on behalf of `spender`,
    /// consuming allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> TokenResult<()> {
        let approved = self.allowance(&owner, &spender);
        let remaining = approved
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                required: amount,
                approved,
            })?;
        self.transfer(owner, to, amount)?;
        self.allowances.insert((owner, spender), remaining);
        Ok(())
    }
}
