// gamm/src/route.rs

use crate::{GammError, GammResult};
use amm_core::{validate_denom, PoolId};
use serde::{Deserialize, Serialize};

/// One hop of a route with both ends explicit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapHop {
    pub pool_id: PoolId,
    pub denom_in: String,
    pub denom_out: String,
}

/// Exact-in hop as submitted by clients: the pool and the denom it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapAmountInRoute {
    pub pool_id: PoolId,
    pub token_out_denom: String,
}

/// Exact-out hop as submitted by clients: the pool and the denom it consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapAmountOutRoute {
    pub pool_id: PoolId,
    pub token_in_denom: String,
}

/// A validated, non-empty chain of hops
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapRoute {
    hops: Vec<SwapHop>,
}

impl SwapRoute {
    /// Validate and wrap a hop list
    pub fn new(hops: Vec<SwapHop>) -> GammResult<Self> {
        let route = Self { hops };
        route.validate()?;
        Ok(route)
    }

    /// Build from an input denom and `(pool_id, token_out_denom)` hops
    pub fn from_exact_in(denom_in: &str, hops: &[SwapAmountInRoute]) -> GammResult<Self> {
        let mut current = denom_in.to_string();
        let mut built = Vec::with_capacity(hops.len());
        for hop in hops {
            built.push(SwapHop {
                pool_id: hop.pool_id,
                denom_in: std::mem::replace(&mut current, hop.token_out_denom.clone()),
                denom_out: hop.token_out_denom.clone(),
            });
        }
        Self::new(built)
    }

    /// Build from `(pool_id, token_in_denom)` hops and the final output denom
    pub fn from_exact_out(hops: &[SwapAmountOutRoute], denom_out: &str) -> GammResult<Self> {
        let built = hops
            .iter()
            .enumerate()
            .map(|(i, hop)| SwapHop {
                pool_id: hop.pool_id,
                denom_in: hop.token_in_denom.clone(),
                denom_out: hops
                    .get(i + 1)
                    .map(|next| next.token_in_denom.clone())
                    .unwrap_or_else(|| denom_out.to_string()),
            })
            .collect();
        Self::new(built)
    }

    /// Non-empty, no self-swaps, and each hop consumes what the previous one produced
    pub fn validate(&self) -> GammResult<()> {
        if self.hops.is_empty() {
            return Err(GammError::InvalidRoute("route is empty".into()));
        }
        for (i, hop) in self.hops.iter().enumerate() {
            for denom in [&hop.denom_in, &hop.denom_out] {
                validate_denom(denom)
                    .map_err(|e| GammError::InvalidRoute(format!("hop {}: {}", i, e)))?;
            }
            if hop.denom_in == hop.denom_out {
                return Err(GammError::InvalidRoute(format!(
                    "hop {} swaps {} for itself",
                    i, hop.denom_in
                )));
            }
        }
        for (i, pair) in self.hops.windows(2).enumerate() {
            if pair[0].denom_out != pair[1].denom_in {
                return Err(GammError::InvalidRoute(format!(
                    "hop {} produces {} but hop {} consumes {}",
                    i,
                    pair[0].denom_out,
                    i + 1,
                    pair[1].denom_in
                )));
            }
        }
        Ok(())
    }

    pub fn hops(&self) -> &[SwapHop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn first_pool_id(&self) -> PoolId {
        self.hops[0].pool_id
    }

    pub fn denom_in(&self) -> &str {
        &self.hops[0].denom_in
    }

    pub fn denom_out(&self) -> &str {
        &self.hops[self.hops.len() - 1].denom_out
    }
}

/// Pair up the parallel `pool_ids` / `denoms` sequences of the query front end
pub fn zip_route_parts(pool_ids: &[PoolId], denoms: &[String]) -> GammResult<Vec<(PoolId, String)>> {
    if pool_ids.len() != denoms.len() {
        return Err(GammError::InvalidRoute(format!(
            "{} pool ids but {} denoms",
            pool_ids.len(),
            denoms.len()
        )));
    }
    Ok(pool_ids.iter().copied().zip(denoms.iter().cloned()).collect())
}

/// Exact-in hops from parallel sequences
pub fn exact_in_routes(pool_ids: &[PoolId], token_out_denoms: &[String]) -> GammResult<Vec<SwapAmountInRoute>> {
    Ok(zip_route_parts(pool_ids, token_out_denoms)?
        .into_iter()
        .map(|(pool_id, token_out_denom)| SwapAmountInRoute {
            pool_id,
            token_out_denom,
        })
        .collect())
}

/// Exact-out hops from parallel sequences
pub fn exact_out_routes(pool_ids: &[PoolId], token_in_denoms: &[String]) -> GammResult<Vec<SwapAmountOutRoute>> {
    Ok(zip_route_parts(pool_ids, token_in_denoms)?
        .into_iter()
        .map(|(pool_id, token_in_denom)| SwapAmountOutRoute {
            pool_id,
            token_in_denom,
        })
        .collect())
}
