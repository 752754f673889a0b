// gamm/src/service.rs

//! Service object owning the pool store and the bank.
//!
//! Every mutating call follows the same order: validate and price on staged
//! copies, check the sender can pay, commit the pool state, then move coins.
//! Coin moves cannot fail once funds are checked, so a failed call leaves
//! both the store and the bank untouched.

use crate::bank::{Bank, FEE_COLLECTOR, MODULE_ACCOUNT};
use crate::pool::{init_pool_shares, prepare_assets, share_denom, PoolAsset, PoolParams};
use crate::query::PoolQuerier;
use crate::route::{SwapAmountInRoute, SwapAmountOutRoute, SwapRoute};
use crate::router::{SwapPlan, SwapRouter};
use crate::shares::{self, ExitOutcome, JoinOutcome};
use crate::store::PoolStore;
use crate::{GammError, GammResult};
use amm_core::{validate_denom, Amount, Coin, Dec, PoolId};
use serde::{Deserialize, Serialize};

/// Module parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GammParams {
    /// Charged to the creator of every pool and sent to the fee collector
    #[serde(default)]
    pub pool_creation_fee: Vec<Coin>,
}

impl GammParams {
    pub fn validate(&self) -> GammResult<()> {
        for coin in &self.pool_creation_fee {
            validate_denom(&coin.denom).map_err(|e| GammError::InvalidParameter(e.to_string()))?;
        }
        Ok(())
    }
}

/// Pool engine bound to its store and bank
pub struct GammService<S: PoolStore, B: Bank> {
    store: S,
    bank: B,
    params: GammParams,
}

impl<S: PoolStore, B: Bank> GammService<S, B> {
    pub fn new(store: S, bank: B, params: GammParams) -> Self {
        Self { store, bank, params }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn params(&self) -> &GammParams {
        &self.params
    }

    pub fn into_parts(self) -> (S, B, GammParams) {
        (self.store, self.bank, self.params)
    }

    /// Read-only queries over the store
    pub fn querier(&self) -> PoolQuerier<'_, S> {
        PoolQuerier::new(&self.store)
    }

    /// Create a pool from `(deposit, raw weight)` pairs and mint the initial shares to `sender`
    pub fn create_pool(
        &mut self,
        sender: &str,
        assets: Vec<(Coin, Dec)>,
        swap_fee: Dec,
        exit_fee: Dec,
    ) -> GammResult<PoolId> {
        let params = PoolParams::new(swap_fee, exit_fee)?;
        let pool_assets = prepare_assets(assets)?;
        let deposits: Vec<Coin> = pool_assets.iter().map(PoolAsset::coin).collect();

        let mut required = deposits.clone();
        required.extend(self.params.pool_creation_fee.iter().cloned());
        self.bank.ensure_funds(sender, &required)?;

        let shares = init_pool_shares();
        let pool_id = self.store.create(pool_assets, params, shares.clone())?;

        for fee in &self.params.pool_creation_fee {
            self.bank.send(sender, FEE_COLLECTOR, fee)?;
        }
        for coin in &deposits {
            self.bank.send(sender, MODULE_ACCOUNT, coin)?;
        }
        self.bank.mint(sender, &Coin::new(share_denom(pool_id), shares.clone()))?;

        tracing::info!(
            "Created pool {} by {} with {} ({} shares)",
            pool_id,
            sender,
            display_coins(&deposits),
            shares
        );
        Ok(pool_id)
    }

    /// Proportional deposit of every pool asset
    pub fn join_pool(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        max_tokens_in: &[Coin],
        min_shares_out: &Amount,
    ) -> GammResult<JoinOutcome> {
        let pool = self.store.get(pool_id)?;
        let outcome = shares::join_pool(&pool, max_tokens_in, min_shares_out)?;
        self.settle_join(sender, &outcome)?;

        tracing::info!(
            "Joined pool {}: {} paid {} for {} shares",
            pool_id,
            sender,
            display_coins(&outcome.tokens_in),
            outcome.shares_out
        );
        Ok(outcome)
    }

    /// Single-asset deposit
    pub fn join_swap_extern_amount_in(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        token_in: &Coin,
        min_shares_out: &Amount,
    ) -> GammResult<JoinOutcome> {
        let pool = self.store.get(pool_id)?;
        let outcome = shares::join_swap_extern_amount_in(&pool, token_in, min_shares_out)?;
        self.settle_join(sender, &outcome)?;

        tracing::info!(
            "Joined pool {} single-sided: {} paid {} for {} shares",
            pool_id,
            sender,
            token_in,
            outcome.shares_out
        );
        Ok(outcome)
    }

    /// Proportional withdrawal
    pub fn exit_pool(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        shares_in: &Amount,
        min_tokens_out: &[Coin],
    ) -> GammResult<ExitOutcome> {
        let pool = self.store.get(pool_id)?;
        let outcome = shares::exit_pool(&pool, shares_in, min_tokens_out)?;
        self.settle_exit(sender, pool_id, &outcome)?;

        tracing::info!(
            "Exited pool {}: {} burned {} shares (fee {}) for {}",
            pool_id,
            sender,
            outcome.shares_burned,
            outcome.exit_fee_shares,
            display_coins(&outcome.tokens_out)
        );
        Ok(outcome)
    }

    /// Single-asset withdrawal
    pub fn exit_swap_share_amount_in(
        &mut self,
        sender: &str,
        pool_id: PoolId,
        denom_out: &str,
        shares_in: &Amount,
        min_amount_out: &Amount,
    ) -> GammResult<ExitOutcome> {
        let pool = self.store.get(pool_id)?;
        let outcome = shares::exit_swap_share_amount_in(&pool, denom_out, shares_in, min_amount_out)?;
        self.settle_exit(sender, pool_id, &outcome)?;

        tracing::info!(
            "Exited pool {} single-sided: {} burned {} shares for {}",
            pool_id,
            sender,
            outcome.shares_burned,
            display_coins(&outcome.tokens_out)
        );
        Ok(outcome)
    }

    /// Swap exactly `token_in` along `routes`, receiving at least `min_amount_out`
    pub fn swap_exact_amount_in(
        &mut self,
        sender: &str,
        routes: &[SwapAmountInRoute],
        token_in: &Coin,
        min_amount_out: &Amount,
    ) -> GammResult<Amount> {
        let route = SwapRoute::from_exact_in(&token_in.denom, routes)?;
        let plan = SwapRouter::new(&self.store).plan_exact_in(&route, &token_in.amount, min_amount_out)?;
        self.settle_swap(sender, &plan)?;
        Ok(plan.token_out.amount)
    }

    /// Buy exactly `token_out` along `routes`, paying at most `max_amount_in`
    pub fn swap_exact_amount_out(
        &mut self,
        sender: &str,
        routes: &[SwapAmountOutRoute],
        max_amount_in: &Amount,
        token_out: &Coin,
    ) -> GammResult<Amount> {
        let route = SwapRoute::from_exact_out(routes, &token_out.denom)?;
        let plan = SwapRouter::new(&self.store).plan_exact_out(&route, max_amount_in, &token_out.amount)?;
        self.settle_swap(sender, &plan)?;
        Ok(plan.token_in.amount)
    }

    fn settle_join(&mut self, sender: &str, outcome: &JoinOutcome) -> GammResult<()> {
        self.bank.ensure_funds(sender, &outcome.tokens_in)?;

        let pool = &outcome.pool;
        self.store
            .commit(pool.id(), pool.assets().to_vec(), pool.total_shares().clone())?;

        for coin in &outcome.tokens_in {
            self.bank.send(sender, MODULE_ACCOUNT, coin)?;
        }
        self.bank
            .mint(sender, &Coin::new(pool.share_denom(), outcome.shares_out.clone()))
    }

    fn settle_exit(&mut self, sender: &str, pool_id: PoolId, outcome: &ExitOutcome) -> GammResult<()> {
        let denom = share_denom(pool_id);
        let shares_in = &outcome.shares_burned + &outcome.exit_fee_shares;
        self.bank
            .ensure_funds(sender, &[Coin::new(denom.clone(), shares_in)])?;

        let pool = &outcome.pool;
        self.store
            .commit(pool_id, pool.assets().to_vec(), pool.total_shares().clone())?;

        if !outcome.exit_fee_shares.is_zero() {
            self.bank.send(
                sender,
                FEE_COLLECTOR,
                &Coin::new(denom.clone(), outcome.exit_fee_shares.clone()),
            )?;
        }
        self.bank
            .burn(sender, &Coin::new(denom, outcome.shares_burned.clone()))?;
        for coin in &outcome.tokens_out {
            self.bank.send(MODULE_ACCOUNT, sender, coin)?;
        }
        Ok(())
    }

    fn settle_swap(&mut self, sender: &str, plan: &SwapPlan) -> GammResult<()> {
        self.bank
            .ensure_funds(sender, std::slice::from_ref(&plan.token_in))?;
        plan.commit(&mut self.store)?;

        self.bank.send(sender, MODULE_ACCOUNT, &plan.token_in)?;
        self.bank.send(MODULE_ACCOUNT, sender, &plan.token_out)?;

        let pools: Vec<String> = plan.hops.iter().map(|h| h.pool_id.to_string()).collect();
        tracing::info!(
            "Swapped {} for {} by {} via pools [{}]",
            plan.token_in,
            plan.token_out,
            sender,
            pools.join(", ")
        );
        Ok(())
    }
}

fn display_coins(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(Coin::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
