// amm-core/src/lib.rs

//! Core primitives shared by the liquidity engine
//!
//! This crate provides:
//! - Token amounts and coins
//! - Fixed-point decimal arithmetic with 18 fractional digits
//! - Deterministic fixed-point exponentiation
//! - Height-keyed upgrade table
//! - Epoch hook registry

pub mod dec;
pub mod hooks;
pub mod math;
pub mod types;
pub mod upgrades;

pub use dec::Dec;
pub use hooks::{EpochEvent, EpochHooks, EpochInfo, EpochSchedule, HookRegistry, HookTrigger};
pub use types::*;
pub use upgrades::{Upgrade, UpgradeSchedule};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core arithmetic and scheduling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative value: {0}")]
    NegativeValue(String),

    #[error("Power base out of range: {0}")]
    PowBaseOutOfRange(String),

    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("Power series did not converge after {0} iterations")]
    PowNonConvergence(usize),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upgrade error: {0}")]
    UpgradeError(String),

    #[error("Hook error: {0}")]
    HookError(String),
}
