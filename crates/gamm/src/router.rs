// gamm/src/router.rs

//! Multi-hop swap router.
//!
//! Every hop is priced against a staged copy of its pool, so a pool that
//! appears twice in one route sees its own earlier hop. Nothing reaches the
//! store until the whole route has been priced; the touched pools are then
//! written with a single `commit_batch`.

use crate::pool::Pool;
use crate::pricing::{quote_exact_out, swap_exact_in, swap_exact_out};
use crate::route::SwapRoute;
use crate::store::PoolStore;
use crate::GammResult;
use amm_core::{Amount, Coin, PoolId};
use std::collections::BTreeMap;

/// Amounts moved through one hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResult {
    pub pool_id: PoolId,
    pub token_in: Coin,
    pub token_out: Coin,
}

/// A fully priced route, not yet committed
#[derive(Debug, Clone)]
pub struct SwapPlan {
    /// What the trader pays into the first pool
    pub token_in: Coin,
    /// What the trader receives from the last pool
    pub token_out: Coin,
    /// Per-hop amounts in route order
    pub hops: Vec<HopResult>,
    staged: BTreeMap<PoolId, Pool>,
}

impl SwapPlan {
    /// Pools as they will look after the route, ascending by id
    pub fn staged_pools(&self) -> impl Iterator<Item = &Pool> {
        self.staged.values()
    }

    /// Write every touched pool in one batch
    pub fn commit<S: PoolStore + ?Sized>(&self, store: &mut S) -> GammResult<()> {
        let pools: Vec<Pool> = self.staged.values().cloned().collect();
        store.commit_batch(&pools)
    }
}

/// Read-only router over a pool store
pub struct SwapRouter<'a, S: PoolStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PoolStore + ?Sized> SwapRouter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load(&self, staged: &BTreeMap<PoolId, Pool>, pool_id: PoolId) -> GammResult<Pool> {
        match staged.get(&pool_id) {
            Some(pool) => Ok(pool.clone()),
            None => self.store.get(pool_id),
        }
    }

    /// Price an exact-in route. Intermediate hops must produce at least one
    /// unit; only the last hop is held to `min_amount_out`.
    pub fn plan_exact_in(&self, route: &SwapRoute, amount_in: &Amount, min_amount_out: &Amount) -> GammResult<SwapPlan> {
        route.validate()?;

        let one = Amount::from_u64(1);
        let last = route.len() - 1;
        let mut staged = BTreeMap::new();
        let mut hops = Vec::with_capacity(route.len());
        let mut amount = amount_in.clone();

        for (i, hop) in route.hops().iter().enumerate() {
            let pool = self.load(&staged, hop.pool_id)?;
            let min_out = if i == last { min_amount_out } else { &one };
            let outcome = swap_exact_in(&pool, &hop.denom_in, &amount, &hop.denom_out, min_out)?;

            hops.push(HopResult {
                pool_id: hop.pool_id,
                token_in: Coin::new(hop.denom_in.clone(), amount),
                token_out: Coin::new(hop.denom_out.clone(), outcome.amount_out.clone()),
            });
            staged.insert(hop.pool_id, outcome.pool);
            amount = outcome.amount_out;
        }

        Ok(SwapPlan {
            token_in: Coin::new(route.denom_in(), amount_in.clone()),
            token_out: Coin::new(route.denom_out(), amount),
            hops,
            staged,
        })
    }

    /// Price an exact-out route backward from the last hop. Only the first
    /// hop's input is held to `max_amount_in`.
    pub fn plan_exact_out(&self, route: &SwapRoute, max_amount_in: &Amount, amount_out: &Amount) -> GammResult<SwapPlan> {
        self.plan_exact_out_bounded(route, Some(max_amount_in), amount_out)
    }

    fn plan_exact_out_bounded(
        &self,
        route: &SwapRoute,
        max_amount_in: Option<&Amount>,
        amount_out: &Amount,
    ) -> GammResult<SwapPlan> {
        route.validate()?;

        let mut staged = BTreeMap::new();
        let mut hops = Vec::with_capacity(route.len());
        let mut amount = amount_out.clone();

        for (i, hop) in route.hops().iter().enumerate().rev() {
            let pool = self.load(&staged, hop.pool_id)?;
            let outcome = match (i, max_amount_in) {
                (0, Some(max)) => swap_exact_out(&pool, &hop.denom_in, max, &hop.denom_out, &amount)?,
                _ => quote_exact_out(&pool, &hop.denom_in, &hop.denom_out, &amount)?,
            };

            hops.push(HopResult {
                pool_id: hop.pool_id,
                token_in: Coin::new(hop.denom_in.clone(), outcome.amount_in.clone()),
                token_out: Coin::new(hop.denom_out.clone(), amount),
            });
            staged.insert(hop.pool_id, outcome.pool);
            amount = outcome.amount_in;
        }
        hops.reverse();

        Ok(SwapPlan {
            token_in: Coin::new(route.denom_in(), amount),
            token_out: Coin::new(route.denom_out(), amount_out.clone()),
            hops,
            staged,
        })
    }

    /// Output of an exact-in route, without committing
    pub fn estimate_exact_in(&self, route: &SwapRoute, amount_in: &Amount) -> GammResult<Amount> {
        Ok(self.plan_exact_in(route, amount_in, &Amount::zero())?.token_out.amount)
    }

    /// Input an exact-out route needs, without committing
    pub fn estimate_exact_out(&self, route: &SwapRoute, amount_out: &Amount) -> GammResult<Amount> {
        Ok(self.plan_exact_out_bounded(route, None, amount_out)?.token_in.amount)
    }
}

/// Price and commit an exact-in route
pub fn execute_exact_in<S: PoolStore + ?Sized>(
    store: &mut S,
    route: &SwapRoute,
    amount_in: &Amount,
    min_amount_out: &Amount,
) -> GammResult<SwapPlan> {
    let plan = SwapRouter::new(&*store).plan_exact_in(route, amount_in, min_amount_out)?;
    plan.commit(store)?;
    tracing::debug!("Routed {} to {} over {} hops", plan.token_in, plan.token_out, plan.hops.len());
    Ok(plan)
}

/// Price and commit an exact-out route
pub fn execute_exact_out<S: PoolStore + ?Sized>(
    store: &mut S,
    route: &SwapRoute,
    max_amount_in: &Amount,
    amount_out: &Amount,
) -> GammResult<SwapPlan> {
    let plan = SwapRouter::new(&*store).plan_exact_out(route, max_amount_in, amount_out)?;
    plan.commit(store)?;
    tracing::debug!("Routed {} to {} over {} hops", plan.token_in, plan.token_out, plan.hops.len());
    Ok(plan)
}
