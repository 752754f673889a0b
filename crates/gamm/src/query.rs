// gamm/src/query.rs

//! Read-side helpers shared by the service, the JSON-RPC methods and the CLI.

use crate::pool::{Pool, PoolAsset};
use crate::pricing;
use crate::route::{SwapAmountInRoute, SwapAmountOutRoute, SwapRoute};
use crate::router::SwapRouter;
use crate::store::PoolStore;
use crate::{GammError, GammResult};
use amm_core::{Amount, Coin, Dec, PoolId};
use serde::{Deserialize, Serialize};

/// Weight of one pool asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWeight {
    pub denom: String,
    pub weight: Dec,
}

/// Fees and weights of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParamsResponse {
    pub swap_fee: Dec,
    pub exit_fee: Dec,
    pub weights: Vec<PoolWeight>,
}

/// Read-only view over a pool store
pub struct PoolQuerier<'a, S: PoolStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PoolStore + ?Sized> PoolQuerier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn pool(&self, pool_id: PoolId) -> GammResult<Pool> {
        self.store.get(pool_id)
    }

    pub fn pools(&self) -> GammResult<Vec<Pool>> {
        self.store.list()
    }

    pub fn pool_params(&self, pool_id: PoolId) -> GammResult<PoolParamsResponse> {
        let pool = self.store.get(pool_id)?;
        Ok(PoolParamsResponse {
            swap_fee: pool.swap_fee().clone(),
            exit_fee: pool.exit_fee().clone(),
            weights: pool
                .weights()
                .into_iter()
                .map(|(denom, weight)| PoolWeight { denom, weight })
                .collect(),
        })
    }

    pub fn total_share(&self, pool_id: PoolId) -> GammResult<Coin> {
        Ok(self.store.get(pool_id)?.total_share_coin())
    }

    pub fn records(&self, pool_id: PoolId) -> GammResult<Vec<PoolAsset>> {
        Ok(self.store.get(pool_id)?.assets().to_vec())
    }

    pub fn spot_price(&self, pool_id: PoolId, denom_in: &str, denom_out: &str) -> GammResult<Dec> {
        let pool = self.store.get(pool_id)?;
        pricing::spot_price(&pool, denom_in, denom_out)
    }

    /// Simulated output of an exact-in route. `pool_id` must name the first hop.
    pub fn estimate_swap_exact_amount_in(
        &self,
        pool_id: PoolId,
        sender: &str,
        token_in: &Coin,
        routes: &[SwapAmountInRoute],
    ) -> GammResult<Amount> {
        let route = SwapRoute::from_exact_in(&token_in.denom, routes)?;
        check_outer_pool(pool_id, &route)?;
        tracing::debug!("Estimating {} in for {} over {} hops", token_in, sender, route.len());
        SwapRouter::new(self.store).estimate_exact_in(&route, &token_in.amount)
    }

    /// Simulated input of an exact-out route. `pool_id` must name the first hop.
    pub fn estimate_swap_exact_amount_out(
        &self,
        pool_id: PoolId,
        sender: &str,
        routes: &[SwapAmountOutRoute],
        token_out: &Coin,
    ) -> GammResult<Amount> {
        let route = SwapRoute::from_exact_out(routes, &token_out.denom)?;
        check_outer_pool(pool_id, &route)?;
        tracing::debug!("Estimating {} out for {} over {} hops", token_out, sender, route.len());
        SwapRouter::new(self.store).estimate_exact_out(&route, &token_out.amount)
    }
}

fn check_outer_pool(pool_id: PoolId, route: &SwapRoute) -> GammResult<()> {
    if route.first_pool_id() != pool_id {
        return Err(GammError::InvalidRoute(format!(
            "pool {} is not the first hop of the route (pool {})",
            pool_id,
            route.first_pool_id()
        )));
    }
    Ok(())
}
