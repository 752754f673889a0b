// gamm/src/genesis.rs

use crate::incentives::DistrInfo;
use crate::pool::Pool;
use crate::service::GammParams;
use crate::store::PoolStore;
use crate::{GammError, GammResult};
use amm_core::PoolId;
use serde::{Deserialize, Serialize};

/// Exported module state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: GammParams,
    pub next_pool_id: PoolId,
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub distr_info: DistrInfo,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: GammParams::default(),
            next_pool_id: 1,
            pools: Vec::new(),
            distr_info: DistrInfo::default(),
        }
    }
}

impl GenesisState {
    /// Check every pool invariant and the id bookkeeping
    pub fn validate(&self) -> GammResult<()> {
        self.params.validate()?;
        if self.next_pool_id == 0 {
            return Err(GammError::InvalidParameter("next pool id must be at least 1".into()));
        }

        let mut ids: Vec<PoolId> = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            pool.validate()?;
            if pool.id() == 0 || pool.id() >= self.next_pool_id {
                return Err(GammError::InvalidParameter(format!(
                    "pool id {} outside 1..{}",
                    pool.id(),
                    self.next_pool_id
                )));
            }
            if ids.contains(&pool.id()) {
                return Err(GammError::InvalidParameter(format!(
                    "duplicate pool id {}",
                    pool.id()
                )));
            }
            ids.push(pool.id());
        }

        self.distr_info.validate()?;
        if let Some(record) = self
            .distr_info
            .records
            .iter()
            .find(|r| !ids.contains(&r.pool_id))
        {
            return Err(GammError::InvalidParameter(format!(
                "incentive record for unknown pool {}",
                record.pool_id
            )));
        }
        Ok(())
    }
}

/// Snapshot the store
pub fn export_genesis<S: PoolStore + ?Sized>(
    store: &S,
    params: &GammParams,
    distr_info: &DistrInfo,
) -> GammResult<GenesisState> {
    Ok(GenesisState {
        params: params.clone(),
        next_pool_id: store.next_pool_id()?,
        pools: store.list()?,
        distr_info: distr_info.clone(),
    })
}

/// Validate the whole state first, then write every pool and the id counter
pub fn import_genesis<S: PoolStore + ?Sized>(store: &mut S, genesis: GenesisState) -> GammResult<(GammParams, DistrInfo)> {
    genesis.validate()?;

    let count = genesis.pools.len();
    for pool in genesis.pools {
        store.restore(pool)?;
    }
    store.set_next_pool_id(genesis.next_pool_id)?;

    tracing::info!(
        "Imported {} pools, next pool id {}",
        count,
        genesis.next_pool_id
    );
    Ok((genesis.params, genesis.distr_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{init_pool_shares, PoolAsset, PoolParams};
    use crate::store::MemoryPoolStore;
    use amm_core::{Amount, Dec};

    fn pool(id: PoolId, weight_a: &str, weight_b: &str) -> Pool {
        Pool::from_parts(
            id,
            PoolParams::new(Dec::zero(), Dec::zero()).unwrap(),
            vec![
                PoolAsset { denom: "uatom".into(), weight: weight_a.parse().unwrap(), balance: Amount::from_u64(10) },
                PoolAsset { denom: "uosmo".into(), weight: weight_b.parse().unwrap(), balance: Amount::from_u64(10) },
            ],
            init_pool_shares(),
        )
    }

    #[test]
    fn test_export_import_preserves_pools() {
        let mut source = MemoryPoolStore::new();
        source.restore(pool(1, "0.5", "0.5")).unwrap();
        source.restore(pool(2, "0.2", "0.8")).unwrap();
        source.set_next_pool_id(3).unwrap();

        let genesis = export_genesis(&source, &GammParams::default(), &DistrInfo::default()).unwrap();
        let json = serde_json::to_string(&genesis).unwrap();
        let parsed: GenesisState = serde_json::from_str(&json).unwrap();

        let mut target = MemoryPoolStore::new();
        import_genesis(&mut target, parsed).unwrap();
        assert_eq!(target.list().unwrap(), source.list().unwrap());
        assert_eq!(target.next_pool_id().unwrap(), 3);
    }

    #[test]
    fn test_import_rejects_bad_state_without_writing() {
        let mut store = MemoryPoolStore::new();

        let unnormalized = GenesisState {
            next_pool_id: 3,
            pools: vec![pool(1, "0.5", "0.5"), pool(2, "1", "1")],
            ..GenesisState::default()
        };
        assert!(import_genesis(&mut store, unnormalized).is_err());
        assert!(store.is_empty());

        let duplicate = GenesisState {
            next_pool_id: 3,
            pools: vec![pool(1, "0.5", "0.5"), pool(1, "0.5", "0.5")],
            ..GenesisState::default()
        };
        assert!(import_genesis(&mut store, duplicate).is_err());

        let stale_counter = GenesisState {
            next_pool_id: 1,
            pools: vec![pool(1, "0.5", "0.5")],
            ..GenesisState::default()
        };
        assert!(import_genesis(&mut store, stale_counter).is_err());
        assert!(store.is_empty());
    }
}
