// gamm/src/pricing.rs

//! Pricing engine for weighted pools.
//!
//! All functions are pure: they read a pool and return an updated copy
//! without touching any store. Outputs are truncated and required inputs are
//! rounded up, so integer rounding always favors the pool.

use crate::pool::Pool;
use crate::{GammError, GammResult};
use amm_core::math::pow;
use amm_core::{Amount, Dec};

/// Largest fraction of the input reserve one swap may add, as `(numerator, denominator)`
pub const MAX_IN_RATIO: (u64, u64) = (1, 2);

/// Largest fraction of the output reserve one swap may remove
pub const MAX_OUT_RATIO: (u64, u64) = (1, 3);

/// Result of pricing a single-pool swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_in: Amount,
    pub amount_out: Amount,
    /// Pool with the swap applied, ready to commit
    pub pool: Pool,
}

pub(crate) fn one_minus(x: &Dec) -> Dec {
    &Dec::one() - x
}

/// `amount / balance > numerator / denominator`
pub(crate) fn exceeds_ratio(amount: &Amount, balance: &Amount, (numerator, denominator): (u64, u64)) -> bool {
    amount.inner() * denominator > balance.inner() * numerator
}

fn check_pair(denom_in: &str, denom_out: &str) -> GammResult<()> {
    if denom_in == denom_out {
        return Err(GammError::InvalidParameter(format!(
            "cannot swap {} for itself",
            denom_in
        )));
    }
    Ok(())
}

/// `(balance_in / weight_in) / (balance_out / weight_out)`
pub fn spot_price(pool: &Pool, denom_in: &str, denom_out: &str) -> GammResult<Dec> {
    let asset_in = pool.asset(denom_in)?;
    let asset_out = pool.asset(denom_out)?;

    let numerator = Dec::from_amount(&asset_in.balance).mul(&asset_out.weight);
    let denominator = Dec::from_amount(&asset_out.balance).mul(&asset_in.weight);
    Ok(numerator.quo(&denominator)?)
}

/// Spot price grossed up by the swap fee: what the next marginal unit costs
pub fn spot_price_with_swap_fee(pool: &Pool, denom_in: &str, denom_out: &str) -> GammResult<Dec> {
    let spot = spot_price(pool, denom_in, denom_out)?;
    Ok(spot.quo(&one_minus(pool.swap_fee()))?)
}

/// `balance_out * (1 - (balance_in / (balance_in + amount_in * (1 - fee))) ^ (weight_in / weight_out))`
pub fn calc_out_given_in(
    balance_in: &Dec,
    weight_in: &Dec,
    balance_out: &Dec,
    weight_out: &Dec,
    amount_in: &Dec,
    swap_fee: &Dec,
) -> GammResult<Dec> {
    let weight_ratio = weight_in.quo(weight_out)?;
    let adjusted_in = amount_in.mul(&one_minus(swap_fee));
    let y = balance_in.quo(&(balance_in + &adjusted_in))?;
    let foo = pow(&y, &weight_ratio)?;
    Ok(balance_out.mul(&one_minus(&foo)))
}

/// `balance_in * ((balance_out / (balance_out - amount_out)) ^ (weight_out / weight_in) - 1) / (1 - fee)`
pub fn calc_in_given_out(
    balance_in: &Dec,
    weight_in: &Dec,
    balance_out: &Dec,
    weight_out: &Dec,
    amount_out: &Dec,
    swap_fee: &Dec,
) -> GammResult<Dec> {
    let weight_ratio = weight_out.quo(weight_in)?;
    let diff = balance_out - amount_out;
    let y = balance_out.quo(&diff)?;
    let foo = pow(&y, &weight_ratio)?;
    let bar = &foo - &Dec::one();
    Ok(balance_in.mul(&bar).quo(&one_minus(swap_fee))?)
}

fn apply_swap(
    pool: &Pool,
    denom_in: &str,
    amount_in: &Amount,
    denom_out: &str,
    amount_out: &Amount,
) -> GammResult<Pool> {
    let mut updated = pool.clone();

    let asset_in = updated.asset_mut(denom_in)?;
    asset_in.balance = &asset_in.balance + amount_in;

    let asset_out = updated.asset_mut(denom_out)?;
    asset_out.balance = asset_out.balance.checked_sub(amount_out).ok_or_else(|| {
        GammError::InsufficientLiquidity(format!(
            "pool {} holds less than {}{}",
            pool.id(),
            amount_out,
            denom_out
        ))
    })?;

    Ok(updated)
}

/// Swap a fixed input for as much output as the pool gives, at least `min_amount_out`
pub fn swap_exact_in(
    pool: &Pool,
    denom_in: &str,
    amount_in: &Amount,
    denom_out: &str,
    min_amount_out: &Amount,
) -> GammResult<SwapOutcome> {
    check_pair(denom_in, denom_out)?;
    if amount_in.is_zero() {
        return Err(GammError::InvalidParameter("token in amount must be positive".into()));
    }

    let asset_in = pool.asset(denom_in)?;
    let asset_out = pool.asset(denom_out)?;

    if exceeds_ratio(amount_in, &asset_in.balance, MAX_IN_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{}{} exceeds the max in ratio of pool {}",
            amount_in,
            denom_in,
            pool.id()
        )));
    }

    let amount_out = calc_out_given_in(
        &Dec::from_amount(&asset_in.balance),
        &asset_in.weight,
        &Dec::from_amount(&asset_out.balance),
        &asset_out.weight,
        &Dec::from_amount(amount_in),
        pool.swap_fee(),
    )?
    .truncate_amount()?;

    if amount_out >= asset_out.balance || exceeds_ratio(&amount_out, &asset_out.balance, MAX_OUT_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{}{} exceeds the max out ratio of pool {}",
            amount_out,
            denom_out,
            pool.id()
        )));
    }
    if amount_out < *min_amount_out {
        return Err(GammError::SlippageExceeded(format!(
            "{}{} out is less than the minimum {}",
            amount_out, denom_out, min_amount_out
        )));
    }
    if amount_out.is_zero() {
        return Err(GammError::InvalidParameter(format!(
            "{}{} buys no {}",
            amount_in, denom_in, denom_out
        )));
    }

    let updated = apply_swap(pool, denom_in, amount_in, denom_out, &amount_out)?;
    Ok(SwapOutcome {
        amount_in: amount_in.clone(),
        amount_out,
        pool: updated,
    })
}

/// Price a fixed output without bounding the input
pub fn quote_exact_out(
    pool: &Pool,
    denom_in: &str,
    denom_out: &str,
    amount_out: &Amount,
) -> GammResult<SwapOutcome> {
    check_pair(denom_in, denom_out)?;
    if amount_out.is_zero() {
        return Err(GammError::InvalidParameter("token out amount must be positive".into()));
    }

    let asset_in = pool.asset(denom_in)?;
    let asset_out = pool.asset(denom_out)?;

    if *amount_out >= asset_out.balance || exceeds_ratio(amount_out, &asset_out.balance, MAX_OUT_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{}{} exceeds the max out ratio of pool {}",
            amount_out,
            denom_out,
            pool.id()
        )));
    }

    let amount_in = calc_in_given_out(
        &Dec::from_amount(&asset_in.balance),
        &asset_in.weight,
        &Dec::from_amount(&asset_out.balance),
        &asset_out.weight,
        &Dec::from_amount(amount_out),
        pool.swap_fee(),
    )?
    .ceil_amount()?;

    if amount_in.is_zero() {
        return Err(GammError::InvalidParameter(format!(
            "{}{} costs no {}",
            amount_out, denom_out, denom_in
        )));
    }
    if exceeds_ratio(&amount_in, &asset_in.balance, MAX_IN_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{}{} exceeds the max in ratio of pool {}",
            amount_in,
            denom_in,
            pool.id()
        )));
    }

    let updated = apply_swap(pool, denom_in, &amount_in, denom_out, amount_out)?;
    Ok(SwapOutcome {
        amount_in,
        amount_out: amount_out.clone(),
        pool: updated,
    })
}

/// Buy a fixed output for at most `max_amount_in`
pub fn swap_exact_out(
    pool: &Pool,
    denom_in: &str,
    max_amount_in: &Amount,
    denom_out: &str,
    amount_out: &Amount,
) -> GammResult<SwapOutcome> {
    let outcome = quote_exact_out(pool, denom_in, denom_out, amount_out)?;
    if outcome.amount_in > *max_amount_in {
        return Err(GammError::SlippageExceeded(format!(
            "{}{} in is more than the maximum {}",
            outcome.amount_in, denom_in, max_amount_in
        )));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{prepare_assets, PoolAsset, PoolParams, MAX_WEIGHT_RATIO};
    use amm_core::{Coin, CoreError};

    fn d(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn pool(balances: &[(&str, u64, &str)], swap_fee: &str) -> Pool {
        let assets = prepare_assets(
            balances
                .iter()
                .map(|(denom, amount, weight)| (Coin::new(*denom, Amount::from_u64(*amount)), d(weight)))
                .collect(),
        )
        .unwrap();
        let params = PoolParams::new(d(swap_fee), Dec::zero()).unwrap();
        Pool::from_parts(1, params, assets, crate::pool::init_pool_shares())
    }

    #[test]
    fn test_balanced_pool_example() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0");

        let exact = calc_out_given_in(&d("100"), &d("0.5"), &d("100"), &d("0.5"), &d("10"), &Dec::zero()).unwrap();
        // 100 - 100 * 100 / 110
        assert_eq!(exact, d("9.090909090909090900"));

        let outcome = swap_exact_in(&pool, "tokena", &Amount::from_u64(10), "tokenb", &Amount::zero()).unwrap();
        assert_eq!(outcome.amount_out, Amount::from_u64(9));
        assert_eq!(outcome.pool.asset("tokena").unwrap().balance, Amount::from_u64(110));
        assert_eq!(outcome.pool.asset("tokenb").unwrap().balance, Amount::from_u64(91));
    }

    #[test]
    fn test_spot_price() {
        let pool = pool(&[("tokena", 200, "1"), ("tokenb", 100, "1")], "0");
        assert_eq!(spot_price(&pool, "tokena", "tokenb").unwrap(), d("2"));
        assert_eq!(spot_price(&pool, "tokenb", "tokena").unwrap(), d("0.5"));

        let weighted = pool_with_weights();
        // (100 / 0.2) / (400 / 0.8)
        assert_eq!(spot_price(&weighted, "tokena", "tokenb").unwrap(), Dec::one());
    }

    fn pool_with_weights() -> Pool {
        pool(&[("tokena", 100, "1"), ("tokenb", 400, "4")], "0")
    }

    #[test]
    fn test_spot_price_with_fee() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0.5");
        assert_eq!(spot_price_with_swap_fee(&pool, "tokena", "tokenb").unwrap(), d("2"));
    }

    #[test]
    fn test_spot_price_unknown_denom() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0");
        assert!(matches!(
            spot_price(&pool, "tokena", "tokenc"),
            Err(GammError::DenomNotFound { .. })
        ));
    }

    #[test]
    fn test_slippage_rejected() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0");
        let err = swap_exact_in(&pool, "tokena", &Amount::from_u64(10), "tokenb", &Amount::from_u64(10)).unwrap_err();
        assert!(matches!(err, GammError::SlippageExceeded(_)));

        let err = swap_exact_out(&pool, "tokena", &Amount::from_u64(10), "tokenb", &Amount::from_u64(10)).unwrap_err();
        assert!(matches!(err, GammError::SlippageExceeded(_)));
    }

    #[test]
    fn test_ratio_guards() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0");
        let err = swap_exact_in(&pool, "tokena", &Amount::from_u64(51), "tokenb", &Amount::zero()).unwrap_err();
        assert!(matches!(err, GammError::InsufficientLiquidity(_)));

        let err = quote_exact_out(&pool, "tokena", "tokenb", &Amount::from_u64(34)).unwrap_err();
        assert!(matches!(err, GammError::InsufficientLiquidity(_)));

        let err = quote_exact_out(&pool, "tokena", "tokenb", &Amount::from_u64(100)).unwrap_err();
        assert!(matches!(err, GammError::InsufficientLiquidity(_)));
    }

    #[test]
    fn test_invalid_parameters() {
        let pool = pool(&[("tokena", 100, "1"), ("tokenb", 100, "1")], "0");
        assert!(matches!(
            swap_exact_in(&pool, "tokena", &Amount::zero(), "tokenb", &Amount::zero()),
            Err(GammError::InvalidParameter(_))
        ));
        assert!(matches!(
            swap_exact_in(&pool, "tokena", &Amount::from_u64(1), "tokena", &Amount::zero()),
            Err(GammError::InvalidParameter(_))
        ));
        // 1 unit in buys nothing out of a 100/100 pool
        assert!(matches!(
            swap_exact_in(&pool, "tokena", &Amount::from_u64(1), "tokenb", &Amount::zero()),
            Err(GammError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_exact_out_rounds_up() {
        let pool = pool(&[("tokena", 1_000_000, "1"), ("tokenb", 1_000_000, "1")], "0");
        let outcome = quote_exact_out(&pool, "tokena", "tokenb", &Amount::from_u64(9_900)).unwrap();
        // 1e6 * (1e6 / 990100 - 1) = 9998.99...
        assert_eq!(outcome.amount_in, Amount::from_u64(9_999));
        assert_eq!(outcome.pool.asset("tokenb").unwrap().balance, Amount::from_u64(990_100));
    }

    #[test]
    fn test_fee_round_trip_at_integer_level() {
        let pool = pool(&[("tokena", 1_000_000, "1"), ("tokenb", 1_000_000, "1")], "0.003");
        let forward = swap_exact_in(&pool, "tokena", &Amount::from_u64(10_000), "tokenb", &Amount::zero()).unwrap();
        assert_eq!(forward.amount_out, Amount::from_u64(9_871));

        let back = swap_exact_out(&pool, "tokena", &Amount::from_u64(10_000), "tokenb", &forward.amount_out).unwrap();
        assert_eq!(back.amount_in, Amount::from_u64(10_000));
    }

    #[test]
    fn test_round_trip_without_fee_recovers_input() {
        let amount_in = d("12345");
        let out = calc_out_given_in(&d("1000000"), &d("0.5"), &d("1000000"), &d("0.5"), &amount_in, &Dec::zero()).unwrap();
        let back = calc_in_given_out(&d("1000000"), &d("0.5"), &d("1000000"), &d("0.5"), &out, &Dec::zero()).unwrap();
        assert!((&back - &amount_in).abs() <= d("0.000001"), "{} vs {}", back, amount_in);
    }

    #[test]
    fn test_unequal_weights() {
        // 20/80 pool priced at parity
        let pool = pool_with_weights();
        let outcome = swap_exact_in(&pool, "tokena", &Amount::from_u64(10), "tokenb", &Amount::zero()).unwrap();
        // 400 * (1 - (100/110)^0.25) = 9.4...
        assert_eq!(outcome.amount_out, Amount::from_u64(9));
    }

    #[test]
    fn test_extreme_weight_ratio_fails_fast() {
        // stored before weight ratios were bounded
        let legacy = Pool::from_parts(
            1,
            PoolParams::new(Dec::zero(), Dec::zero()).unwrap(),
            vec![
                PoolAsset { denom: "tokena".into(), weight: d("0.000000000999999999"), balance: Amount::from_u64(1_000_000) },
                PoolAsset { denom: "tokenb".into(), weight: d("0.999999999000000001"), balance: Amount::from_u64(1_000_000) },
            ],
            crate::pool::init_pool_shares(),
        );
        assert!(matches!(
            quote_exact_out(&legacy, "tokena", "tokenb", &Amount::from_u64(300_000)),
            Err(GammError::Math(CoreError::PowBaseOutOfRange(_)))
        ));
    }

    #[test]
    fn test_widest_allowed_pool_overflows_instead_of_hanging() {
        let limit = MAX_WEIGHT_RATIO.to_string();
        let pool = pool(&[("tokena", 1_000_000, "1"), ("tokenb", 1_000_000, limit.as_str())], "0");
        assert!(matches!(
            quote_exact_out(&pool, "tokena", "tokenb", &Amount::from_u64(300_000)),
            Err(GammError::Math(CoreError::Overflow(_)))
        ));
        // the cheap direction still prices
        quote_exact_out(&pool, "tokenb", "tokena", &Amount::from_u64(300_000)).unwrap();
    }
}
