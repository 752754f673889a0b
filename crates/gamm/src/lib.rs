// gamm/src/lib.rs

//! Weighted multi-asset liquidity pools
//!
//! This crate implements the pool engine:
//! - Pool model with normalized weights
//! - Pool store contract and an in-memory store
//! - Pricing engine (spot price, exact-in and exact-out swaps)
//! - Share accounting (joins and exits, proportional and single-asset)
//! - Multi-hop swap router with staged, all-or-nothing commits
//! - Bank capability and the service object tying it together
//! - Pool incentive records, fee tokens, genesis and state migrations

pub mod bank;
pub mod fees;
pub mod genesis;
pub mod incentives;
pub mod migrations;
pub mod pool;
pub mod pricing;
pub mod query;
pub mod route;
pub mod router;
pub mod service;
pub mod shares;
pub mod store;

pub use bank::{Bank, MemoryBank, FEE_COLLECTOR, MODULE_ACCOUNT};
pub use fees::{FeeToken, FeeTokens, UpdateFeeTokenProposal};
pub use genesis::GenesisState;
pub use incentives::{DistrInfo, DistrRecord, UpdatePoolIncentivesProposal};
pub use pool::{Pool, PoolAsset, PoolParams};
pub use pricing::SwapOutcome;
pub use query::{PoolParamsResponse, PoolQuerier, PoolWeight};
pub use route::{SwapAmountInRoute, SwapAmountOutRoute, SwapHop, SwapRoute};
pub use router::{execute_exact_in, execute_exact_out, HopResult, SwapPlan, SwapRouter};
pub use service::{GammParams, GammService};
pub use shares::{ExitOutcome, JoinOutcome};
pub use store::{MemoryPoolStore, PoolStore};

use amm_core::{Amount, CoreError, PoolId};

/// Result type for pool operations
pub type GammResult<T> = Result<T, GammError>;

/// Errors that can occur in pool operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GammError {
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("Denom {denom} not found in pool {pool_id}")]
    DenomNotFound { pool_id: PoolId, denom: String },

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Slippage exceeded: {0}")]
    SlippageExceeded(String),

    #[error("Insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient funds: {account} has {available}{denom}, needs {required}{denom}")]
    InsufficientFunds {
        account: String,
        denom: String,
        required: Amount,
        available: Amount,
    },

    #[error("Math error: {0}")]
    Math(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by front ends to map errors to codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRoute,
    SlippageExceeded,
    InsufficientLiquidity,
    InvalidParameter,
    InsufficientFunds,
    Internal,
}

impl GammError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GammError::PoolNotFound(_) | GammError::DenomNotFound { .. } => ErrorKind::NotFound,
            GammError::InvalidRoute(_) => ErrorKind::InvalidRoute,
            GammError::SlippageExceeded(_) => ErrorKind::SlippageExceeded,
            GammError::InsufficientLiquidity(_) => ErrorKind::InsufficientLiquidity,
            GammError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            GammError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            GammError::Math(CoreError::ParseError(_))
            | GammError::Math(CoreError::PowBaseOutOfRange(_))
            | GammError::Math(CoreError::Overflow(_)) => ErrorKind::InvalidParameter,
            GammError::Math(_) | GammError::Storage(_) => ErrorKind::Internal,
        }
    }
}
