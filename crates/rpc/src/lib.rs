// rpc/src/lib.rs

//! JSON-RPC query façade over a pool store

pub mod methods;
pub mod server;
pub mod types;

pub use methods::RpcMethods;
pub use server::{RpcConfig, RpcServer};
pub use types::*;

use gamm::{ErrorKind, GammError};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Parse error")]
    ParseError,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid route: {0}")]
    InvalidRoute(String),
    #[error("Slippage exceeded: {0}")]
    SlippageExceeded(String),
    #[error("Insufficient liquidity: {0}")]
    InsufficientLiquidity(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::ParseError => -32700,
            RpcError::InvalidRequest => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::InternalError(_) => -32603,
            RpcError::ServerError(_) => -32000,
            RpcError::NotFound(_) => -32004,
            RpcError::InvalidRoute(_) => -32010,
            RpcError::SlippageExceeded(_) => -32011,
            RpcError::InsufficientLiquidity(_) => -32012,
            RpcError::InsufficientFunds(_) => -32013,
        }
    }
}

impl From<GammError> for RpcError {
    fn from(err: GammError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => RpcError::NotFound(message),
            ErrorKind::InvalidRoute => RpcError::InvalidRoute(message),
            ErrorKind::SlippageExceeded => RpcError::SlippageExceeded(message),
            ErrorKind::InsufficientLiquidity => RpcError::InsufficientLiquidity(message),
            ErrorKind::InvalidParameter => RpcError::InvalidParams(message),
            ErrorKind::InsufficientFunds => RpcError::InsufficientFunds(message),
            ErrorKind::Internal => RpcError::InternalError(message),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
