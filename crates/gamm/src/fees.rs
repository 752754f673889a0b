// gamm/src/fees.rs

//! Fee tokens: denoms accepted for fees besides the base denom, each priced
//! in the base denom through one pool.

use crate::pricing;
use crate::store::PoolStore;
use crate::{GammError, GammResult};
use amm_core::{validate_denom, Coin, Dec, PoolId};
use serde::{Deserialize, Serialize};

/// Denom fees are settled in unless a fee token is used
pub const DEFAULT_BASE_DENOM: &str = "uosmo";

/// A non-base fee denom and the pool that prices it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeToken {
    pub denom: String,
    /// Pool 0 removes the fee token
    pub pool_id: PoolId,
}

/// Base denom plus every accepted fee token, sorted by denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTokens {
    pub base_denom: String,
    pub tokens: Vec<FeeToken>,
}

impl Default for FeeTokens {
    fn default() -> Self {
        Self {
            base_denom: DEFAULT_BASE_DENOM.to_string(),
            tokens: Vec::new(),
        }
    }
}

/// Governance proposal adding, repointing or removing one fee token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFeeTokenProposal {
    pub title: String,
    pub description: String,
    pub fee_token: FeeToken,
}

impl UpdateFeeTokenProposal {
    /// Stateless checks
    pub fn validate_basic(&self) -> GammResult<()> {
        if self.title.trim().is_empty() {
            return Err(GammError::InvalidParameter("proposal title is empty".into()));
        }
        validate_denom(&self.fee_token.denom).map_err(|e| GammError::InvalidParameter(e.to_string()))
    }
}

impl FeeTokens {
    pub fn fee_token(&self, denom: &str) -> Option<&FeeToken> {
        self.tokens.iter().find(|t| t.denom == denom)
    }

    /// Stateless checks plus a pricing check of every token against `store`
    pub fn validate<S: PoolStore + ?Sized>(&self, store: &S) -> GammResult<()> {
        validate_denom(&self.base_denom).map_err(|e| GammError::InvalidParameter(e.to_string()))?;
        for pair in self.tokens.windows(2) {
            if pair[0].denom >= pair[1].denom {
                return Err(GammError::InvalidParameter(
                    "fee tokens must be unique and sorted by denom".into(),
                ));
            }
        }
        for token in &self.tokens {
            self.check_fee_token(store, token)?;
        }
        Ok(())
    }

    /// The pool must exist and hold both denoms at a defined spot price
    fn check_fee_token<S: PoolStore + ?Sized>(&self, store: &S, token: &FeeToken) -> GammResult<()> {
        if token.denom == self.base_denom {
            return Err(GammError::InvalidParameter(format!(
                "{} is the base denom and cannot be a fee token",
                token.denom
            )));
        }
        let pool = store.get(token.pool_id)?;
        pricing::spot_price(&pool, &self.base_denom, &token.denom)?;
        Ok(())
    }

    /// Apply a proposal: pool 0 removes the token, any other pool sets it
    pub fn apply_proposal<S: PoolStore + ?Sized>(
        &mut self,
        store: &S,
        proposal: &UpdateFeeTokenProposal,
    ) -> GammResult<()> {
        proposal.validate_basic()?;
        let token = &proposal.fee_token;

        if token.pool_id == 0 {
            let before = self.tokens.len();
            self.tokens.retain(|t| t.denom != token.denom);
            if self.tokens.len() == before {
                return Err(GammError::InvalidParameter(format!(
                    "{} is not a fee token",
                    token.denom
                )));
            }
            tracing::info!("Removed fee token {}", token.denom);
            return Ok(());
        }

        self.check_fee_token(store, token)?;
        match self.tokens.binary_search_by(|t| t.denom.as_str().cmp(&token.denom)) {
            Ok(i) => self.tokens[i] = token.clone(),
            Err(i) => self.tokens.insert(i, token.clone()),
        }
        tracing::info!("Fee token {} now priced by pool {}", token.denom, token.pool_id);
        Ok(())
    }

    /// Value of `coin` in the base denom at the current spot price, truncated
    pub fn convert_to_base<S: PoolStore + ?Sized>(&self, store: &S, coin: &Coin) -> GammResult<Coin> {
        if coin.denom == self.base_denom {
            return Ok(coin.clone());
        }
        let token = self.fee_token(&coin.denom).ok_or_else(|| {
            GammError::InvalidParameter(format!("{} is not a fee token", coin.denom))
        })?;
        let pool = store.get(token.pool_id)?;
        let price = pricing::spot_price(&pool, &self.base_denom, &coin.denom)?;
        let amount = Dec::from_amount(&coin.amount).mul_truncate(&price).truncate_amount()?;
        Ok(Coin::new(self.base_denom.clone(), amount))
    }
}
