// node/src/genesis.rs

//! Node genesis file: genesis time, funded accounts and the pool module state.

use amm_core::{Amount, Coin};
use chrono::{DateTime, Utc};
use gamm::genesis::GenesisState;
use gamm::{Bank, FeeTokens, MemoryBank, MODULE_ACCOUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: String,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGenesis {
    /// Epoch counting starts here
    pub genesis_time: DateTime<Utc>,
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub gamm: GenesisState,
    #[serde(default)]
    pub fee_tokens: FeeTokens,
}

impl NodeGenesis {
    pub fn new(genesis_time: DateTime<Utc>) -> Self {
        Self {
            genesis_time,
            accounts: Vec::new(),
            gamm: GenesisState::default(),
            fee_tokens: FeeTokens::default(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Ledger holding every account balance
    pub fn build_bank(&self) -> anyhow::Result<MemoryBank> {
        let mut bank = MemoryBank::new();
        for account in &self.accounts {
            anyhow::ensure!(!account.address.is_empty(), "genesis account without address");
            for coin in &account.coins {
                bank.mint(&account.address, coin)?;
            }
        }
        Ok(bank)
    }

    /// Module state must be valid and fully backed: the module account holds
    /// exactly the pool reserves and each share supply equals its pool's total.
    pub fn validate(&self, bank: &MemoryBank) -> anyhow::Result<()> {
        self.gamm.validate()?;

        let mut reserves: BTreeMap<&str, Amount> = BTreeMap::new();
        for pool in &self.gamm.pools {
            for asset in pool.assets() {
                let entry = reserves.entry(asset.denom.as_str()).or_default();
                *entry = &*entry + &asset.balance;
            }
            let supply = bank.supply(&pool.share_denom());
            anyhow::ensure!(
                &supply == pool.total_shares(),
                "pool {} has {} shares but accounts hold {}",
                pool.id(),
                pool.total_shares(),
                supply
            );
        }

        for (denom, total) in reserves {
            let held = bank.balance(MODULE_ACCOUNT, denom);
            anyhow::ensure!(
                held == total,
                "module account holds {}{} but pools reserve {}{}",
                held,
                denom,
                total,
                denom
            );
        }
        Ok(())
    }

    /// Collect accounts back out of a ledger
    pub fn accounts_from_bank(bank: &MemoryBank) -> Vec<GenesisAccount> {
        bank.accounts()
            .map(|address| GenesisAccount {
                address: address.to_string(),
                coins: bank.all_balances(address),
            })
            .filter(|account| !account.coins.is_empty())
            .collect()
    }
}
