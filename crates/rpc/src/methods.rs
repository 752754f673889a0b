// rpc/src/methods.rs
use crate::{
    EstimateSwapExactAmountInParams, EstimateSwapExactAmountOutParams, PoolIdParams, RpcError, RpcResult,
    SpotPriceParams,
};
use amm_core::Coin;
use gamm::route::{exact_in_routes, exact_out_routes};
use gamm::{DistrInfo, PoolQuerier, PoolStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-only method table. Only ever takes read locks.
pub struct RpcMethods<S> {
    store: Arc<RwLock<S>>,
    distr_info: Arc<RwLock<DistrInfo>>,
}

impl<S: PoolStore + Send + Sync> RpcMethods<S> {
    pub fn new(store: Arc<RwLock<S>>, distr_info: Arc<RwLock<DistrInfo>>) -> Self {
        Self { store, distr_info }
    }

    pub async fn handle(&self, method: &str, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        tracing::debug!("RPC call {}", method);
        match method {
            "gamm_pool" => self.gamm_pool(params).await,
            "gamm_pools" => self.gamm_pools().await,
            "gamm_poolParams" => self.gamm_pool_params(params).await,
            "gamm_totalShare" => self.gamm_total_share(params).await,
            "gamm_records" => self.gamm_records(params).await,
            "gamm_spotPrice" => self.gamm_spot_price(params).await,
            "gamm_estimateSwapExactAmountIn" => self.gamm_estimate_swap_exact_amount_in(params).await,
            "gamm_estimateSwapExactAmountOut" => self.gamm_estimate_swap_exact_amount_out(params).await,
            "gamm_distrInfo" => self.gamm_distr_info().await,

            _ => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    // ==================== POOL QUERIES ====================

    async fn gamm_pool(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: PoolIdParams = parse_params(params)?;
        let store = self.store.read().await;
        let pool = PoolQuerier::new(&*store).pool(params.pool_id)?;
        to_json(&pool)
    }

    async fn gamm_pools(&self) -> RpcResult<serde_json::Value> {
        let store = self.store.read().await;
        let pools = PoolQuerier::new(&*store).pools()?;
        to_json(&pools)
    }

    async fn gamm_pool_params(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: PoolIdParams = parse_params(params)?;
        let store = self.store.read().await;
        let response = PoolQuerier::new(&*store).pool_params(params.pool_id)?;
        to_json(&response)
    }

    async fn gamm_total_share(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: PoolIdParams = parse_params(params)?;
        let store = self.store.read().await;
        let total = PoolQuerier::new(&*store).total_share(params.pool_id)?;
        to_json(&total)
    }

    async fn gamm_records(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: PoolIdParams = parse_params(params)?;
        let store = self.store.read().await;
        let records = PoolQuerier::new(&*store).records(params.pool_id)?;
        to_json(&records)
    }

    async fn gamm_spot_price(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: SpotPriceParams = parse_params(params)?;
        let store = self.store.read().await;
        let price = PoolQuerier::new(&*store).spot_price(
            params.pool_id,
            &params.token_in_denom,
            &params.token_out_denom,
        )?;
        Ok(serde_json::json!({ "spot_price": price.to_string() }))
    }

    // ==================== ESTIMATES ====================

    async fn gamm_estimate_swap_exact_amount_in(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: EstimateSwapExactAmountInParams = parse_params(params)?;
        let routes = exact_in_routes(&params.swap_route_pool_ids, &params.swap_route_denoms)?;
        let token_in = parse_coin(&params.token_in)?;

        let store = self.store.read().await;
        let amount_out = PoolQuerier::new(&*store).estimate_swap_exact_amount_in(
            params.pool_id,
            &params.sender,
            &token_in,
            &routes,
        )?;
        Ok(serde_json::json!({ "token_out_amount": amount_out.to_string() }))
    }

    async fn gamm_estimate_swap_exact_amount_out(&self, params: serde_json::Value) -> RpcResult<serde_json::Value> {
        let params: EstimateSwapExactAmountOutParams = parse_params(params)?;
        let routes = exact_out_routes(&params.swap_route_pool_ids, &params.swap_route_denoms)?;
        let token_out = parse_coin(&params.token_out)?;

        let store = self.store.read().await;
        let amount_in = PoolQuerier::new(&*store).estimate_swap_exact_amount_out(
            params.pool_id,
            &params.sender,
            &routes,
            &token_out,
        )?;
        Ok(serde_json::json!({ "token_in_amount": amount_in.to_string() }))
    }

    // ==================== INCENTIVES ====================

    async fn gamm_distr_info(&self) -> RpcResult<serde_json::Value> {
        let distr_info = self.distr_info.read().await;
        to_json(&*distr_info)
    }
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> RpcResult<T> {
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn parse_coin(raw: &str) -> RpcResult<Coin> {
    raw.parse()
        .map_err(|e: amm_core::CoreError| RpcError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> RpcResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RpcError::InternalError(e.to_string()))
}
