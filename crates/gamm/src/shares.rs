// gamm/src/shares.rs

//! Share accounting.
//!
//! Proportional joins mint shares for the smallest deposit ratio across all
//! assets and consume only what that ratio needs. Exits charge the exit fee
//! in shares and release a pro-rata slice of every reserve. The single-asset
//! variants follow the Balancer single-sided formulas.

use crate::pool::Pool;
use crate::pricing::{exceeds_ratio, one_minus, MAX_IN_RATIO, MAX_OUT_RATIO};
use crate::{GammError, GammResult};
use amm_core::math::pow;
use amm_core::{Amount, Coin, Dec};

/// Result of a deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Shares minted to the depositor
    pub shares_out: Amount,
    /// Tokens actually taken from the depositor
    pub tokens_in: Vec<Coin>,
    /// Pool with the deposit applied
    pub pool: Pool,
}

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Shares moved to the fee collector
    pub exit_fee_shares: Amount,
    /// Shares removed from the supply
    pub shares_burned: Amount,
    /// Tokens released to the withdrawer
    pub tokens_out: Vec<Coin>,
    /// Pool with the withdrawal applied
    pub pool: Pool,
}

fn exit_fee_shares(pool: &Pool, shares_in: &Amount) -> GammResult<Amount> {
    Ok(Dec::from_amount(shares_in)
        .mul_round_up(pool.exit_fee())
        .ceil_amount()?)
}

fn shares_after_exit_fee(pool: &Pool, shares_in: &Amount) -> GammResult<(Amount, Amount)> {
    let fee = exit_fee_shares(pool, shares_in)?;
    let after_fee = shares_in.checked_sub(&fee).ok_or_else(|| {
        GammError::InvalidParameter(format!("exit fee exceeds {} shares", shares_in))
    })?;
    Ok((fee, after_fee))
}

/// Deposit every pool asset in proportion, minting at least `min_shares_out`
pub fn join_pool(pool: &Pool, max_tokens_in: &[Coin], min_shares_out: &Amount) -> GammResult<JoinOutcome> {
    if max_tokens_in.len() != pool.assets().len() {
        return Err(GammError::InvalidParameter(format!(
            "join of pool {} must supply all {} assets",
            pool.id(),
            pool.assets().len()
        )));
    }
    for (i, coin) in max_tokens_in.iter().enumerate() {
        if pool.asset(&coin.denom).is_err() {
            return Err(GammError::InvalidParameter(format!(
                "{} is not an asset of pool {}",
                coin.denom,
                pool.id()
            )));
        }
        if max_tokens_in[..i].iter().any(|c| c.denom == coin.denom) {
            return Err(GammError::InvalidParameter(format!("duplicate denom {}", coin.denom)));
        }
        if coin.is_zero() {
            return Err(GammError::InvalidParameter(format!(
                "deposit of {} must be positive",
                coin.denom
            )));
        }
    }

    let total = pool.total_shares();
    if total.is_zero() {
        return Err(GammError::InvalidParameter(format!("pool {} has no shares", pool.id())));
    }

    // floor(total * min(in / balance)) == min(floor(total * in / balance))
    let mut shares_out: Option<Amount> = None;
    for asset in pool.assets() {
        let Some(coin) = max_tokens_in.iter().find(|c| c.denom == asset.denom) else {
            continue;
        };
        let candidate = total.mul_div_floor(&coin.amount, &asset.balance)?;
        shares_out = Some(match shares_out {
            Some(current) if current <= candidate => current,
            _ => candidate,
        });
    }
    let shares_out = shares_out.unwrap_or_default();

    if shares_out < *min_shares_out {
        return Err(GammError::SlippageExceeded(format!(
            "{} shares out is less than the minimum {}",
            shares_out, min_shares_out
        )));
    }
    if shares_out.is_zero() {
        return Err(GammError::InvalidParameter(format!(
            "deposit into pool {} is too small to mint a share unit",
            pool.id()
        )));
    }

    let mut updated = pool.clone();
    let mut tokens_in = Vec::with_capacity(pool.assets().len());
    for asset in pool.assets() {
        let needed = asset.balance.mul_div_ceil(&shares_out, total)?;
        updated.asset_mut(&asset.denom)?.balance = &asset.balance + &needed;
        tokens_in.push(Coin::new(asset.denom.clone(), needed));
    }
    updated.set_total_shares(total + &shares_out);

    Ok(JoinOutcome {
        shares_out,
        tokens_in,
        pool: updated,
    })
}

/// Burn shares for a pro-rata slice of every reserve
pub fn exit_pool(pool: &Pool, shares_in: &Amount, min_tokens_out: &[Coin]) -> GammResult<ExitOutcome> {
    let total = pool.total_shares();
    if shares_in.is_zero() || shares_in > total {
        return Err(GammError::InvalidParameter(format!(
            "cannot exit {} of {} shares of pool {}",
            shares_in,
            total,
            pool.id()
        )));
    }

    let (exit_fee_shares, shares_burned) = shares_after_exit_fee(pool, shares_in)?;

    let mut updated = pool.clone();
    let mut tokens_out = Vec::with_capacity(pool.assets().len());
    for asset in pool.assets() {
        let out = asset.balance.mul_div_floor(&shares_burned, total)?;
        let remaining = asset
            .balance
            .checked_sub(&out)
            .filter(|r| !r.is_zero())
            .ok_or_else(|| {
                GammError::InvalidParameter(format!(
                    "exit would empty the {} reserve of pool {}",
                    asset.denom,
                    pool.id()
                ))
            })?;
        updated.asset_mut(&asset.denom)?.balance = remaining;
        if !out.is_zero() {
            tokens_out.push(Coin::new(asset.denom.clone(), out));
        }
    }

    for min in min_tokens_out {
        pool.asset(&min.denom)?;
        let got = tokens_out
            .iter()
            .find(|c| c.denom == min.denom)
            .map(|c| c.amount.clone())
            .unwrap_or_default();
        if got < min.amount {
            return Err(GammError::SlippageExceeded(format!(
                "{}{} out is less than the minimum {}",
                got, min.denom, min.amount
            )));
        }
    }

    let new_total = total.checked_sub(&shares_burned).ok_or_else(|| {
        GammError::InvalidParameter(format!("pool {} share supply underflow", pool.id()))
    })?;
    updated.set_total_shares(new_total);

    Ok(ExitOutcome {
        exit_fee_shares,
        shares_burned,
        tokens_out,
        pool: updated,
    })
}

/// Shares minted for a single-asset deposit:
/// `supply * ((balance + in * (1 - (1 - w) * fee)) / balance) ^ w - supply`
pub fn calc_pool_out_given_single_in(
    balance_in: &Dec,
    weight_in: &Dec,
    total_weight: &Dec,
    pool_supply: &Dec,
    amount_in: &Dec,
    swap_fee: &Dec,
) -> GammResult<Dec> {
    let normalized_weight = weight_in.quo(total_weight)?;
    let zaz = one_minus(&normalized_weight).mul(swap_fee);
    let amount_in_after_fee = amount_in.mul(&one_minus(&zaz));

    let new_balance = balance_in + &amount_in_after_fee;
    let balance_ratio = new_balance.quo(balance_in)?;
    let pool_ratio = pow(&balance_ratio, &normalized_weight)?;

    let new_supply = pool_ratio.mul(pool_supply);
    let minted = &new_supply - pool_supply;
    if minted.is_negative() {
        return Ok(Dec::zero());
    }
    Ok(minted)
}

/// Tokens released for a single-asset withdrawal:
/// `balance * (1 - ((supply - shares) / supply) ^ (1 / w)) * (1 - (1 - w) * fee)`
pub fn calc_single_out_given_pool_in(
    balance_out: &Dec,
    weight_out: &Dec,
    total_weight: &Dec,
    pool_supply: &Dec,
    shares_in: &Dec,
    swap_fee: &Dec,
) -> GammResult<Dec> {
    let normalized_weight = weight_out.quo(total_weight)?;
    let new_supply = pool_supply - shares_in;
    let pool_ratio = new_supply.quo(pool_supply)?;
    let exponent = Dec::one().quo(&normalized_weight)?;
    let token_out_ratio = pow(&pool_ratio, &exponent)?;

    let new_balance = token_out_ratio.mul(balance_out);
    let out_before_fee = balance_out - &new_balance;
    let zaz = one_minus(&normalized_weight).mul(swap_fee);
    Ok(out_before_fee.mul(&one_minus(&zaz)))
}

/// Deposit a single asset, minting at least `min_shares_out`
pub fn join_swap_extern_amount_in(pool: &Pool, token_in: &Coin, min_shares_out: &Amount) -> GammResult<JoinOutcome> {
    if token_in.is_zero() {
        return Err(GammError::InvalidParameter("token in amount must be positive".into()));
    }
    let asset = pool.asset(&token_in.denom)?;
    if exceeds_ratio(&token_in.amount, &asset.balance, MAX_IN_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{} exceeds the max in ratio of pool {}",
            token_in,
            pool.id()
        )));
    }

    let shares_out = calc_pool_out_given_single_in(
        &Dec::from_amount(&asset.balance),
        &asset.weight,
        &pool.total_weight(),
        &Dec::from_amount(pool.total_shares()),
        &Dec::from_amount(&token_in.amount),
        pool.swap_fee(),
    )?
    .truncate_amount()?;

    if shares_out < *min_shares_out {
        return Err(GammError::SlippageExceeded(format!(
            "{} shares out is less than the minimum {}",
            shares_out, min_shares_out
        )));
    }
    if shares_out.is_zero() {
        return Err(GammError::InvalidParameter(format!(
            "{} is too small to mint a share unit",
            token_in
        )));
    }

    let mut updated = pool.clone();
    updated.asset_mut(&token_in.denom)?.balance = &asset.balance + &token_in.amount;
    updated.set_total_shares(pool.total_shares() + &shares_out);

    Ok(JoinOutcome {
        shares_out,
        tokens_in: vec![token_in.clone()],
        pool: updated,
    })
}

/// Burn shares for a single asset, receiving at least `min_amount_out`
pub fn exit_swap_share_amount_in(
    pool: &Pool,
    denom_out: &str,
    shares_in: &Amount,
    min_amount_out: &Amount,
) -> GammResult<ExitOutcome> {
    let total = pool.total_shares();
    if shares_in.is_zero() || shares_in >= total {
        return Err(GammError::InvalidParameter(format!(
            "cannot exit {} of {} shares of pool {} into one asset",
            shares_in,
            total,
            pool.id()
        )));
    }
    let asset = pool.asset(denom_out)?;
    let (exit_fee_shares, shares_burned) = shares_after_exit_fee(pool, shares_in)?;

    // The released fraction is never below the burned share fraction
    if exceeds_ratio(&shares_burned, total, MAX_OUT_RATIO) {
        return Err(GammError::InsufficientLiquidity(format!(
            "{} shares exceed the max out ratio of pool {}",
            shares_burned,
            pool.id()
        )));
    }

    let amount_out = calc_single_out_given_pool_in(
        &Dec::from_amount(&asset.balance),
        &asset.weight,
        &pool.total_weight(),
        &Dec::from_amount(total),
        &Dec::from_amount(&shares_burned),
        pool.swap_fee(),
    )?
    .truncate_amount()?;

    if amount_out >= asset.balance || exceeds_ratio(&amount_out, &asset.balance, MAX_OUT_RATIO) {
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
            "{} shares release no {}",
            shares_in, denom_out
        )));
    }

    let mut updated = pool.clone();
    let remaining = asset.balance.checked_sub(&amount_out).ok_or_else(|| {
        GammError::InsufficientLiquidity(format!("pool {} reserve underflow", pool.id()))
    })?;
    updated.asset_mut(denom_out)?.balance = remaining;
    let new_total = total.checked_sub(&shares_burned).ok_or_else(|| {
        GammError::InvalidParameter(format!("pool {} share supply underflow", pool.id()))
    })?;
    updated.set_total_shares(new_total);

    Ok(ExitOutcome {
        exit_fee_shares,
        shares_burned,
        tokens_out: vec![Coin::new(denom_out, amount_out)],
        pool: updated,
    })
}
