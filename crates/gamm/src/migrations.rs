// gamm/src/migrations.rs

//! Store migrations run by the upgrade table.

use crate::store::PoolStore;
use crate::GammResult;

/// Name of the weight re-normalization upgrade
pub const V2_UPGRADE_NAME: &str = "v2";

/// Bring stored weights in line with current pool rules: lift weights beyond
/// [`crate::pool::MAX_WEIGHT_RATIO`] of the heaviest and rescale every pool to
/// sum to exactly one. Pools already conforming are left alone. Returns how
/// many changed.
pub fn renormalize_pool_weights<S: PoolStore + ?Sized>(store: &mut S) -> GammResult<usize> {
    let mut changed = Vec::new();
    for mut pool in store.list()? {
        if pool.renormalize()? {
            tracing::debug!("Re-normalized weights of pool {}", pool.id());
            changed.push(pool);
        }
    }
    if !changed.is_empty() {
        store.commit_batch(&changed)?;
    }
    tracing::info!("Weight migration touched {} pools", changed.len());
    Ok(changed.len())
}
