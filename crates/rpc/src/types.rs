// rpc/src/types.rs
use amm_core::PoolId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorResponse>,
    pub id: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolIdParams {
    pub pool_id: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPriceParams {
    pub pool_id: PoolId,
    pub token_in_denom: String,
    pub token_out_denom: String,
}

/// Routes travel as two parallel arrays of equal length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSwapExactAmountInParams {
    pub pool_id: PoolId,
    #[serde(default)]
    pub sender: String,
    /// Coin string such as `1000uosmo`
    pub token_in: String,
    pub swap_route_pool_ids: Vec<PoolId>,
    pub swap_route_denoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSwapExactAmountOutParams {
    pub pool_id: PoolId,
    #[serde(default)]
    pub sender: String,
    pub swap_route_pool_ids: Vec<PoolId>,
    pub swap_route_denoms: Vec<String>,
    pub token_out: String,
}
