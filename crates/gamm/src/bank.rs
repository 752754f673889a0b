// gamm/src/bank.rs

use crate::{GammError, GammResult};
use amm_core::{Amount, Coin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Account holding every pool's reserves
pub const MODULE_ACCOUNT: &str = "gamm";

/// Account receiving exit-fee shares and pool creation fees
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Coin transfer capability handed to the engine
pub trait Bank {
    fn balance(&self, account: &str, denom: &str) -> Amount;

    /// Move a coin; fails without side effects when `from` is short
    fn send(&mut self, from: &str, to: &str, coin: &Coin) -> GammResult<()>;

    fn mint(&mut self, to: &str, coin: &Coin) -> GammResult<()>;

    /// Destroy a coin; fails without side effects when `from` is short
    fn burn(&mut self, from: &str, coin: &Coin) -> GammResult<()>;

    /// Check that `account` can cover all of `coins` at once
    fn ensure_funds(&self, account: &str, coins: &[Coin]) -> GammResult<()> {
        let mut required: BTreeMap<&str, Amount> = BTreeMap::new();
        for coin in coins {
            let entry = required.entry(coin.denom.as_str()).or_default();
            *entry = &*entry + &coin.amount;
        }
        for (denom, amount) in required {
            let available = self.balance(account, denom);
            if available < amount {
                return Err(GammError::InsufficientFunds {
                    account: account.to_string(),
                    denom: denom.to_string(),
                    required: amount,
                    available,
                });
            }
        }
        Ok(())
    }
}

/// In-memory ledger of `account -> denom -> amount`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBank {
    balances: BTreeMap<String, BTreeMap<String, Amount>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// All non-zero balances of an account, sorted by denom
    pub fn all_balances(&self, account: &str) -> Vec<Coin> {
        self.balances
            .get(account)
            .map(|denoms| {
                denoms
                    .iter()
                    .filter(|(_, amount)| !amount.is_zero())
                    .map(|(denom, amount)| Coin::new(denom.clone(), amount.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total of a denom across every account
    pub fn supply(&self, denom: &str) -> Amount {
        self.balances
            .values()
            .filter_map(|denoms| denoms.get(denom))
            .fold(Amount::zero(), |acc, amount| &acc + amount)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.balances.keys().map(String::as_str)
    }

    fn debit(&mut self, account: &str, coin: &Coin) -> GammResult<()> {
        let available = self.balance(account, &coin.denom);
        let remaining = available.checked_sub(&coin.amount).ok_or_else(|| GammError::InsufficientFunds {
            account: account.to_string(),
            denom: coin.denom.clone(),
            required: coin.amount.clone(),
            available: available.clone(),
        })?;
        self.balances
            .entry(account.to_string())
            .or_default()
            .insert(coin.denom.clone(), remaining);
        Ok(())
    }

    fn credit(&mut self, account: &str, coin: &Coin) {
        let entry = self
            .balances
            .entry(account.to_string())
            .or_default()
            .entry(coin.denom.clone())
            .or_default();
        *entry = &*entry + &coin.amount;
    }
}

impl Bank for MemoryBank {
    fn balance(&self, account: &str, denom: &str) -> Amount {
        self.balances
            .get(account)
            .and_then(|denoms| denoms.get(denom))
            .cloned()
            .unwrap_or_default()
    }

    fn send(&mut self, from: &str, to: &str, coin: &Coin) -> GammResult<()> {
        self.debit(from, coin)?;
        self.credit(to, coin);
        Ok(())
    }

    fn mint(&mut self, to: &str, coin: &Coin) -> GammResult<()> {
        self.credit(to, coin);
        Ok(())
    }

    fn burn(&mut self, from: &str, coin: &Coin) -> GammResult<()> {
        self.debit(from, coin)
    }
}
