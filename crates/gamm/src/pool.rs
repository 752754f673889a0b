// gamm/src/pool.rs

use crate::{GammError, GammResult};
use amm_core::{validate_denom, Amount, Coin, Dec, PoolId};
use serde::{Deserialize, Serialize};

/// Fewest assets a pool may hold
pub const MIN_POOL_ASSETS: usize = 2;
/// Most assets a pool may hold
pub const MAX_POOL_ASSETS: usize = 8;

/// Heaviest weight of a pool may be at most this many times its lightest.
/// Keeps every pricing exponent, including `1 / weight` for single-asset
/// exits, under [`amm_core::math::MAX_POW_EXPONENT`].
pub const MAX_WEIGHT_RATIO: u64 = 1 << 20;

/// Share supply minted to the creator of a pool: 100 shares of 10^18 units
pub fn init_pool_shares() -> Amount {
    Amount::from_tokens(100)
}

/// Bank denomination of a pool's liquidity shares
pub fn share_denom(pool_id: PoolId) -> String {
    format!("gamm/pool/{}", pool_id)
}

/// One reserve of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAsset {
    /// Token denomination
    pub denom: String,
    /// Normalized weight
    pub weight: Dec,
    /// Reserve balance
    pub balance: Amount,
}

impl PoolAsset {
    pub fn coin(&self) -> Coin {
        Coin::new(self.denom.clone(), self.balance.clone())
    }
}

/// Fee parameters fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Fee taken from the input side of every swap
    pub swap_fee: Dec,
    /// Fee taken in shares on withdrawal
    pub exit_fee: Dec,
}

impl PoolParams {
    pub fn new(swap_fee: Dec, exit_fee: Dec) -> GammResult<Self> {
        let params = Self { swap_fee, exit_fee };
        params.validate()?;
        Ok(params)
    }

    /// Both fees must lie in `[0, 1)`
    pub fn validate(&self) -> GammResult<()> {
        for (name, fee) in [("swap fee", &self.swap_fee), ("exit fee", &self.exit_fee)] {
            if fee.is_negative() || *fee >= Dec::one() {
                return Err(GammError::InvalidParameter(format!(
                    "{} {} must be in [0, 1)",
                    name, fee
                )));
            }
        }
        Ok(())
    }
}

/// A weighted multi-asset pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    id: PoolId,
    params: PoolParams,
    assets: Vec<PoolAsset>,
    total_shares: Amount,
}

impl Pool {
    /// Assemble a pool from stored parts without validation
    pub fn from_parts(id: PoolId, params: PoolParams, assets: Vec<PoolAsset>, total_shares: Amount) -> Self {
        Self {
            id,
            params,
            assets,
            total_shares,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn swap_fee(&self) -> &Dec {
        &self.params.swap_fee
    }

    pub fn exit_fee(&self) -> &Dec {
        &self.params.exit_fee
    }

    /// Assets sorted by denom
    pub fn assets(&self) -> &[PoolAsset] {
        &self.assets
    }

    pub fn total_shares(&self) -> &Amount {
        &self.total_shares
    }

    pub fn share_denom(&self) -> String {
        share_denom(self.id)
    }

    /// Outstanding shares as a coin
    pub fn total_share_coin(&self) -> Coin {
        Coin::new(self.share_denom(), self.total_shares.clone())
    }

    /// Look up an asset by denom
    pub fn asset(&self, denom: &str) -> GammResult<&PoolAsset> {
        self.assets
            .iter()
            .find(|a| a.denom == denom)
            .ok_or_else(|| GammError::DenomNotFound {
                pool_id: self.id,
                denom: denom.to_string(),
            })
    }

    pub(crate) fn asset_mut(&mut self, denom: &str) -> GammResult<&mut PoolAsset> {
        let pool_id = self.id;
        self.assets
            .iter_mut()
            .find(|a| a.denom == denom)
            .ok_or_else(|| GammError::DenomNotFound {
                pool_id,
                denom: denom.to_string(),
            })
    }

    pub(crate) fn set_total_shares(&mut self, total_shares: Amount) {
        self.total_shares = total_shares;
    }

    /// `(denom, weight)` pairs in asset order
    pub fn weights(&self) -> Vec<(String, Dec)> {
        self.assets
            .iter()
            .map(|a| (a.denom.clone(), a.weight.clone()))
            .collect()
    }

    pub fn total_weight(&self) -> Dec {
        self.assets
            .iter()
            .fold(Dec::zero(), |acc, a| &acc + &a.weight)
    }

    /// Reserve balances as coins
    pub fn reserves(&self) -> Vec<Coin> {
        self.assets.iter().map(PoolAsset::coin).collect()
    }

    /// Replace reserves, weights and share supply in one step
    pub fn replace_state(&mut self, assets: Vec<PoolAsset>, total_shares: Amount) {
        self.assets = assets;
        self.total_shares = total_shares;
    }

    /// Check every structural invariant of a stored pool
    pub fn validate(&self) -> GammResult<()> {
        self.params.validate()?;

        if self.assets.len() < MIN_POOL_ASSETS || self.assets.len() > MAX_POOL_ASSETS {
            return Err(GammError::InvalidParameter(format!(
                "pool {} has {} assets, expected {}..={}",
                self.id,
                self.assets.len(),
                MIN_POOL_ASSETS,
                MAX_POOL_ASSETS
            )));
        }
        for pair in self.assets.windows(2) {
            if pair[0].denom >= pair[1].denom {
                return Err(GammError::InvalidParameter(format!(
                    "pool {} assets must be unique and sorted by denom",
                    self.id
                )));
            }
        }
        for asset in &self.assets {
            if !asset.weight.is_positive() {
                return Err(GammError::InvalidParameter(format!(
                    "pool {} weight of {} must be positive",
                    self.id, asset.denom
                )));
            }
            if asset.balance.is_zero() {
                return Err(GammError::InvalidParameter(format!(
                    "pool {} reserve of {} is empty",
                    self.id, asset.denom
                )));
            }
        }
        check_weight_ratio(&self.assets.iter().map(|a| a.weight.clone()).collect::<Vec<_>>())?;
        if self.total_weight() != Dec::one() {
            return Err(GammError::InvalidParameter(format!(
                "pool {} weights sum to {}",
                self.id,
                self.total_weight()
            )));
        }
        if self.total_shares.is_zero() {
            return Err(GammError::InvalidParameter(format!(
                "pool {} has no shares",
                self.id
            )));
        }
        Ok(())
    }

    /// Raise weights lighter than [`MAX_WEIGHT_RATIO`] allows, then rescale
    /// so they sum to exactly one. Returns whether anything changed.
    pub fn renormalize(&mut self) -> GammResult<bool> {
        let raw: Vec<Dec> = self.assets.iter().map(|a| a.weight.clone()).collect();
        if raw.iter().any(|w| !w.is_positive()) {
            return Err(GammError::InvalidParameter(format!(
                "pool {} has a non-positive weight",
                self.id
            )));
        }
        let within_ratio = check_weight_ratio(&raw).is_ok();
        if within_ratio && self.total_weight() == Dec::one() {
            return Ok(false);
        }
        let clamped = if within_ratio { raw } else { clamp_weights(&raw)? };
        let normalized = normalize_weights(&clamped)?;
        for (asset, weight) in self.assets.iter_mut().zip(normalized) {
            asset.weight = weight;
        }
        Ok(true)
    }
}

/// Lift every weight to at least `heaviest / MAX_WEIGHT_RATIO`
fn clamp_weights(raw: &[Dec]) -> GammResult<Vec<Dec>> {
    let Some(heaviest) = raw.iter().max() else {
        return Ok(Vec::new());
    };
    let floor = heaviest.quo_round_up(&Dec::from_u64(MAX_WEIGHT_RATIO))?;
    Ok(raw
        .iter()
        .map(|w| if *w < floor { floor.clone() } else { w.clone() })
        .collect())
}

/// Scale positive raw weights to sum to exactly one.
///
/// Each weight is truncated to 18 digits; the leftover units go to the
/// heaviest raw weight (the first one on ties).
pub fn normalize_weights(raw: &[Dec]) -> GammResult<Vec<Dec>> {
    if raw.is_empty() {
        return Err(GammError::InvalidParameter("no weights given".into()));
    }
    if raw.iter().any(|w| !w.is_positive()) {
        return Err(GammError::InvalidParameter("weights must be positive".into()));
    }

    check_weight_ratio(raw)?;

    let total = raw.iter().fold(Dec::zero(), |acc, w| &acc + w);
    let mut normalized = raw
        .iter()
        .map(|w| w.quo_truncate(&total))
        .collect::<Result<Vec<_>, _>>()?;

    let assigned = normalized.iter().fold(Dec::zero(), |acc, w| &acc + w);
    let remainder = Dec::one() - assigned;
    let heaviest = raw
        .iter()
        .enumerate()
        .fold(0, |best, (i, w)| if *w > raw[best] { i } else { best });
    normalized[heaviest] = &normalized[heaviest] + &remainder;

    if normalized.iter().any(|w| w.is_zero()) {
        return Err(GammError::InvalidParameter(
            "weight too small relative to the total".into(),
        ));
    }
    Ok(normalized)
}

/// Heaviest over lightest, compared on the integer part so that normalizing
/// a ratio of exactly [`MAX_WEIGHT_RATIO`] still passes
fn check_weight_ratio(weights: &[Dec]) -> GammResult<()> {
    let (Some(lightest), Some(heaviest)) = (weights.iter().min(), weights.iter().max()) else {
        return Ok(());
    };
    if !lightest.is_positive() {
        return Err(GammError::InvalidParameter("weights must be positive".into()));
    }
    let ratio = heaviest.quo_truncate(lightest)?;
    if ratio.truncate_dec() > Dec::from_u64(MAX_WEIGHT_RATIO) {
        return Err(GammError::InvalidParameter(format!(
            "weight ratio {} exceeds {}",
            ratio, MAX_WEIGHT_RATIO
        )));
    }
    Ok(())
}

/// Validate creation input and build denom-sorted assets with normalized weights
pub fn prepare_assets(initial: Vec<(Coin, Dec)>) -> GammResult<Vec<PoolAsset>> {
    if initial.len() < MIN_POOL_ASSETS || initial.len() > MAX_POOL_ASSETS {
        return Err(GammError::InvalidParameter(format!(
            "pool needs {}..={} assets, got {}",
            MIN_POOL_ASSETS,
            MAX_POOL_ASSETS,
            initial.len()
        )));
    }

    let mut initial = initial;
    initial.sort_by(|a, b| a.0.denom.cmp(&b.0.denom));

    for pair in initial.windows(2) {
        if pair[0].0.denom == pair[1].0.denom {
            return Err(GammError::InvalidParameter(format!(
                "duplicate denom {}",
                pair[0].0.denom
            )));
        }
    }
    for (coin, _) in &initial {
        validate_denom(&coin.denom).map_err(|e| GammError::InvalidParameter(e.to_string()))?;
        if coin.is_zero() {
            return Err(GammError::InvalidParameter(format!(
                "initial balance of {} must be positive",
                coin.denom
            )));
        }
    }

    let raw: Vec<Dec> = initial.iter().map(|(_, w)| w.clone()).collect();
    let weights = normalize_weights(&raw)?;

    Ok(initial
        .into_iter()
        .zip(weights)
        .map(|((coin, _), weight)| PoolAsset {
            denom: coin.denom,
            weight,
            balance: coin.amount,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn coin(amount: u64, denom: &str) -> Coin {
        Coin::new(denom, Amount::from_u64(amount))
    }

    #[test]
    fn test_normalize_equal_thirds() {
        let weights = normalize_weights(&[d("1"), d("1"), d("1")]).unwrap();
        assert_eq!(weights[0], d("0.333333333333333334"));
        assert_eq!(weights[1], d("0.333333333333333333"));
        assert_eq!(weights[2], d("0.333333333333333333"));
    }

    #[test]
    fn test_remainder_goes_to_heaviest() {
        let weights = normalize_weights(&[d("1"), d("2")]).unwrap();
        assert_eq!(weights[0], d("0.333333333333333333"));
        assert_eq!(weights[1], d("0.666666666666666667"));
    }

    #[test]
    fn test_normalize_rejects_bad_weights() {
        assert!(normalize_weights(&[]).is_err());
        assert!(normalize_weights(&[d("1"), d("0")]).is_err());
        assert!(normalize_weights(&[d("1"), d("-1")]).is_err());
    }

    #[test]
    fn test_weight_ratio_bound() {
        let limit = Dec::from_u64(MAX_WEIGHT_RATIO);
        let weights = normalize_weights(&[d("1"), limit.clone()]).unwrap();
        assert_eq!(weights.iter().fold(Dec::zero(), |acc, w| &acc + w), Dec::one());

        let too_wide = &limit + &d("1");
        assert!(matches!(
            normalize_weights(&[d("1"), too_wide]),
            Err(GammError::InvalidParameter(_))
        ));
        assert!(matches!(
            prepare_assets(vec![(coin(1_000, "tokena"), d("1")), (coin(1_000, "tokenb"), d("1000000000"))]),
            Err(GammError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_validate_rejects_wide_stored_weights() {
        let params = PoolParams::new(d("0"), d("0")).unwrap();
        let assets = vec![
            PoolAsset { denom: "tokena".into(), weight: d("0.000000000999999999"), balance: Amount::from_u64(10) },
            PoolAsset { denom: "tokenb".into(), weight: d("0.999999999000000001"), balance: Amount::from_u64(10) },
        ];
        let pool = Pool::from_parts(1, params, assets, init_pool_shares());
        assert!(matches!(pool.validate(), Err(GammError::InvalidParameter(_))));
    }

    #[test]
    fn test_prepare_assets_sorts_by_denom() {
        let assets = prepare_assets(vec![
            (coin(100, "uosmo"), d("3")),
            (coin(50, "uatom"), d("1")),
        ])
        .unwrap();
        assert_eq!(assets[0].denom, "uatom");
        assert_eq!(assets[0].weight, d("0.25"));
        assert_eq!(assets[1].denom, "uosmo");
        assert_eq!(assets[1].balance, Amount::from_u64(100));
    }

    #[test]
    fn test_prepare_assets_rejects_bad_input() {
        assert!(prepare_assets(vec![(coin(1, "uatom"), d("1"))]).is_err());
        assert!(prepare_assets(vec![
            (coin(1, "uatom"), d("1")),
            (coin(1, "uatom"), d("1")),
        ])
        .is_err());
        assert!(prepare_assets(vec![
            (coin(0, "uatom"), d("1")),
            (coin(1, "uosmo"), d("1")),
        ])
        .is_err());
        let nine: Vec<(Coin, Dec)> = (0..9)
            .map(|i| (coin(1, &format!("token{}", i)), d("1")))
            .collect();
        assert!(prepare_assets(nine).is_err());
    }

    #[test]
    fn test_params_fee_range() {
        assert!(PoolParams::new(d("0.003"), d("0")).is_ok());
        assert!(PoolParams::new(d("1"), d("0")).is_err());
        assert!(PoolParams::new(d("0"), d("-0.1")).is_err());
    }

    #[test]
    fn test_validate_and_renormalize() {
        let params = PoolParams::new(d("0.01"), d("0")).unwrap();
        let assets = vec![
            PoolAsset { denom: "uatom".into(), weight: d("2"), balance: Amount::from_u64(10) },
            PoolAsset { denom: "uosmo".into(), weight: d("6"), balance: Amount::from_u64(10) },
        ];
        let mut pool = Pool::from_parts(1, params, assets, init_pool_shares());
        assert!(pool.validate().is_err());

        assert!(pool.renormalize().unwrap());
        pool.validate().unwrap();
        assert_eq!(pool.asset("uosmo").unwrap().weight, d("0.75"));
        assert!(!pool.renormalize().unwrap());
    }

    #[test]
    fn test_renormalize_tightens_wide_weights() {
        let params = PoolParams::new(d("0"), d("0")).unwrap();
        let assets = vec![
            PoolAsset { denom: "tokena".into(), weight: d("0.000000000999999999"), balance: Amount::from_u64(10) },
            PoolAsset { denom: "tokenb".into(), weight: d("0.999999999000000001"), balance: Amount::from_u64(10) },
        ];
        let mut pool = Pool::from_parts(1, params, assets, init_pool_shares());
        assert!(pool.validate().is_err());

        assert!(pool.renormalize().unwrap());
        pool.validate().unwrap();
        let light = &pool.asset("tokena").unwrap().weight;
        let heavy = &pool.asset("tokenb").unwrap().weight;
        assert!(heavy.quo(light).unwrap() <= Dec::from_u64(MAX_WEIGHT_RATIO + 1));
        assert!(!pool.renormalize().unwrap());
    }

    #[test]
    fn test_share_denom() {
        assert_eq!(share_denom(12), "gamm/pool/12");
        assert!(validate_denom(&share_denom(12)).is_ok());
    }

    proptest! {
        #[test]
        fn prop_normalized_weights_sum_to_one(raw in prop::collection::vec(1u64..1_000_000u64, 2..=8)) {
            let raw: Vec<Dec> = raw.into_iter().map(|w| Dec::new_with_prec(w as i64, 6).unwrap()).collect();
            let weights = normalize_weights(&raw).unwrap();
            let sum = weights.iter().fold(Dec::zero(), |acc, w| &acc + w);
            prop_assert_eq!(sum, Dec::one());
            prop_assert!(weights.iter().all(|w| w.is_positive()));
        }
    }
}
