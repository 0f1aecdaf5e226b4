// ledger-core/src/native.rs

use crate::{Address, Amount, LedgerError, LedgerResult};
use std::collections::{HashMap, HashSet};

/// Per-account native-currency balances.
///
/// Accounts registered as contracts reject plain transfers: native
/// currency may only reach them as the atomic side effect of a
/// qualifying call (`transfer_for_call`), otherwise the funds would sit
/// unaccounted in the receiving contract.
#[derive(Debug, Default)]
pub struct NativeLedger {
    balances: HashMap<Address, Amount>,
    contracts: HashSet<Address>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account as a contract that rejects plain transfers.
    pub fn register_contract(&mut self, account: Address) {
        self.contracts.insert(account);
    }

    pub fn is_contract(&self, account: &Address) -> bool {
        self.contracts.contains(account)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_else(Amount::zero)
    }

    /// Create native currency out of thin air (test and genesis setup).
    pub fn credit(&mut self, account: Address, amount: Amount) -> LedgerResult<()> {
        let balance = self.balance_of(&account);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(account))?;
        self.balances.insert(account, new_balance);
        Ok(())
    }

    /// Plain, undecorated transfer. Rejected when the recipient is a
    /// registered contract.
    pub fn send(&mut self, from: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        if self.is_contract(&to) {
            return Err(LedgerError::TransferRejected(to));
        }
        self.move_balance(from, to, amount)
    }

    /// Transfer performed as part of a qualifying contract call.
    /// Bypasses the plain-transfer guard, balance checks still apply.
    pub fn transfer_for_call(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.move_balance(from, to, amount)
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        let from_balance = self.balance_of(&from);
        let debited = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: from_balance,
            })?;
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(to))?;
        self.balances.insert(from, debited);
        self.balances.insert(to, credited);
        tracing::trace!(%from, %to, %amount, "native transfer");
        Ok(())
    }
}
