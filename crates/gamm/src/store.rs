// gamm/src/store.rs

//! Pool store contract.
//!
//! Stores do CRUD and iteration only. Every invariant is enforced by the
//! callers (service, router, share accounting) before anything is written.

use crate::pool::{Pool, PoolAsset, PoolParams};
use crate::{GammError, GammResult};
use amm_core::{Amount, PoolId};
use std::collections::BTreeMap;

/// Keyed pool storage
pub trait PoolStore {
    /// Id the next created pool will receive
    fn next_pool_id(&self) -> GammResult<PoolId>;

    /// Overwrite the id counter (genesis import)
    fn set_next_pool_id(&mut self, next: PoolId) -> GammResult<()>;

    /// Persist a new pool under the next id and return that id
    fn create(&mut self, assets: Vec<PoolAsset>, params: PoolParams, total_shares: Amount) -> GammResult<PoolId>;

    /// Write a pool under its own id, whether or not it exists (genesis import)
    fn restore(&mut self, pool: Pool) -> GammResult<()>;

    fn get(&self, pool_id: PoolId) -> GammResult<Pool>;

    /// All pools in ascending id order
    fn list(&self) -> GammResult<Vec<Pool>>;

    /// Replace several existing pools at once; writes nothing if any id is unknown
    fn commit_batch(&mut self, pools: &[Pool]) -> GammResult<()>;

    /// Replace the state of one existing pool
    fn commit(&mut self, pool_id: PoolId, assets: Vec<PoolAsset>, total_shares: Amount) -> GammResult<()> {
        let mut pool = self.get(pool_id)?;
        pool.replace_state(assets, total_shares);
        self.commit_batch(std::slice::from_ref(&pool))
    }

    fn exists(&self, pool_id: PoolId) -> GammResult<bool> {
        match self.get(pool_id) {
            Ok(_) => Ok(true),
            Err(GammError::PoolNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// In-memory pool store
#[derive(Debug, Clone)]
pub struct MemoryPoolStore {
    pools: BTreeMap<PoolId, Pool>,
    next_id: PoolId,
}

impl Default for MemoryPoolStore {
    fn default() -> Self {
        Self {
            pools: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryPoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl PoolStore for MemoryPoolStore {
    fn next_pool_id(&self) -> GammResult<PoolId> {
        Ok(self.next_id)
    }

    fn set_next_pool_id(&mut self, next: PoolId) -> GammResult<()> {
        self.next_id = next;
        Ok(())
    }

    fn create(&mut self, assets: Vec<PoolAsset>, params: PoolParams, total_shares: Amount) -> GammResult<PoolId> {
        let id = self.next_id;
        self.pools.insert(id, Pool::from_parts(id, params, assets, total_shares));
        self.next_id += 1;
        Ok(id)
    }

    fn restore(&mut self, pool: Pool) -> GammResult<()> {
        self.pools.insert(pool.id(), pool);
        Ok(())
    }

    fn get(&self, pool_id: PoolId) -> GammResult<Pool> {
        self.pools
            .get(&pool_id)
            .cloned()
            .ok_or(GammError::PoolNotFound(pool_id))
    }

    fn list(&self) -> GammResult<Vec<Pool>> {
        Ok(self.pools.values().cloned().collect())
    }

    fn commit_batch(&mut self, pools: &[Pool]) -> GammResult<()> {
        if let Some(missing) = pools.iter().find(|p| !self.pools.contains_key(&p.id())) {
            return Err(GammError::PoolNotFound(missing.id()));
        }
        for pool in pools {
            self.pools.insert(pool.id(), pool.clone());
        }
        Ok(())
    }
}
