// gamm/src/incentives.rs

//! Pool incentive distribution records.
//!
//! Governance assigns each pool a weight in the incentive distribution.
//! Updating these records never touches reserves or pricing.

use crate::store::PoolStore;
use crate::{GammError, GammResult};
use amm_core::{Amount, PoolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Incentive weight of one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrRecord {
    pub pool_id: PoolId,
    pub weight: Amount,
}

/// All incentive weights, sorted by pool id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrInfo {
    pub total_weight: Amount,
    pub records: Vec<DistrRecord>,
}

/// Governance proposal replacing some incentive weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePoolIncentivesProposal {
    pub title: String,
    pub description: String,
    /// Weight 0 removes the pool's record
    pub records: Vec<DistrRecord>,
}

impl UpdatePoolIncentivesProposal {
    /// Stateless checks
    pub fn validate_basic(&self) -> GammResult<()> {
        if self.title.trim().is_empty() {
            return Err(GammError::InvalidParameter("proposal title is empty".into()));
        }
        if self.records.is_empty() {
            return Err(GammError::InvalidParameter("proposal has no records".into()));
        }
        for (i, record) in self.records.iter().enumerate() {
            if self.records[..i].iter().any(|r| r.pool_id == record.pool_id) {
                return Err(GammError::InvalidParameter(format!(
                    "pool {} appears twice in the proposal",
                    record.pool_id
                )));
            }
        }
        Ok(())
    }
}

impl DistrInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight_of(&self, pool_id: PoolId) -> Option<&Amount> {
        self.records
            .iter()
            .find(|r| r.pool_id == pool_id)
            .map(|r| &r.weight)
    }

    /// Records sorted and unique, weights positive, total consistent
    pub fn validate(&self) -> GammResult<()> {
        for pair in self.records.windows(2) {
            if pair[0].pool_id >= pair[1].pool_id {
                return Err(GammError::InvalidParameter(
                    "incentive records must be unique and sorted by pool id".into(),
                ));
            }
        }
        if let Some(record) = self.records.iter().find(|r| r.weight.is_zero()) {
            return Err(GammError::InvalidParameter(format!(
                "incentive record for pool {} has zero weight",
                record.pool_id
            )));
        }
        let sum = self
            .records
            .iter()
            .fold(Amount::zero(), |acc, r| &acc + &r.weight);
        if sum != self.total_weight {
            return Err(GammError::InvalidParameter(format!(
                "incentive total weight {} does not match records sum {}",
                self.total_weight, sum
            )));
        }
        Ok(())
    }

    /// Apply a proposal after checking that every referenced pool exists
    pub fn apply_proposal<S: PoolStore + ?Sized>(
        &mut self,
        store: &S,
        proposal: &UpdatePoolIncentivesProposal,
    ) -> GammResult<()> {
        proposal.validate_basic()?;
        for record in &proposal.records {
            if !store.exists(record.pool_id)? {
                return Err(GammError::InvalidParameter(format!(
                    "incentive record for unknown pool {}",
                    record.pool_id
                )));
            }
        }

        let mut weights: BTreeMap<PoolId, Amount> = self
            .records
            .iter()
            .map(|r| (r.pool_id, r.weight.clone()))
            .collect();
        for record in &proposal.records {
            if record.weight.is_zero() {
                weights.remove(&record.pool_id);
            } else {
                weights.insert(record.pool_id, record.weight.clone());
            }
        }

        self.records = weights
            .into_iter()
            .map(|(pool_id, weight)| DistrRecord { pool_id, weight })
            .collect();
        self.total_weight = self
            .records
            .iter()
            .fold(Amount::zero(), |acc, r| &acc + &r.weight);

        tracing::info!(
            "Applied incentives proposal '{}': {} records, total weight {}",
            proposal.title,
            self.records.len(),
            self.total_weight
        );
        Ok(())
    }
}
