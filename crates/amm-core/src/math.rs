// amm-core/src/math.rs

//! Deterministic fixed-point exponentiation.
//!
//! `pow(base, exp)` splits the exponent into its integer and fractional
//! parts. The integer part is computed exactly by repeated squaring; the
//! fractional part uses the binomial series
//!
//! ```text
//! (1 + x)^a = 1 + a·x + a(a-1)/2!·x² + a(a-1)(a-2)/3!·x³ + ...
//! ```
//!
//! with `x = base - 1`, stopping once a term drops below [`pow_precision`].
//! The series only converges for `|x| < 1`, hence the `(0, 2)` base range.

use crate::{CoreError, CoreResult, Dec};
use num_traits::ToPrimitive;

/// Hard cap on series terms
pub const MAX_POW_ITERATIONS: usize = 300;

/// Largest integer part of an exponent
pub const MAX_POW_EXPONENT: u64 = 1 << 23;

/// Terms below `10^-8` are dropped
pub fn pow_precision() -> Dec {
    Dec::from_raw(10_000_000_000u64.into())
}

fn min_base() -> Dec {
    Dec::from_raw(1u64.into())
}

fn max_base() -> Dec {
    Dec::from_u64(2) - Dec::from_raw(1u64.into())
}

/// `base ^ exp` for `base` in `(0, 2)` and non-negative `exp`
pub fn pow(base: &Dec, exp: &Dec) -> CoreResult<Dec> {
    if *base < min_base() {
        return Err(CoreError::PowBaseOutOfRange(format!(
            "base {} must be greater than 0",
            base
        )));
    }
    if *base > max_base() {
        return Err(CoreError::PowBaseOutOfRange(format!(
            "base {} must be less than 2",
            base
        )));
    }
    if exp.is_negative() {
        return Err(CoreError::PowBaseOutOfRange(format!(
            "exponent {} must not be negative",
            exp
        )));
    }

    let integer = exp.truncate_dec();
    let fractional = exp - &integer;

    let whole_exp = integer
        .truncate_int()
        .to_u64()
        .filter(|n| *n <= MAX_POW_EXPONENT)
        .ok_or_else(|| {
            CoreError::PowBaseOutOfRange(format!(
                "exponent {} exceeds {}",
                exp, MAX_POW_EXPONENT
            ))
        })?;
    let whole = base.pow_int(whole_exp)?;

    if fractional.is_zero() {
        return Ok(whole);
    }

    let partial = pow_approx(base, &fractional, &pow_precision())?;
    Ok(whole.mul(&partial))
}

/// Binomial-series approximation of `base ^ exp` for `exp` in `[0, 1)`
pub fn pow_approx(base: &Dec, exp: &Dec, precision: &Dec) -> CoreResult<Dec> {
    if exp.is_zero() {
        return Ok(Dec::one());
    }

    let one = Dec::one();
    let x = base - &one;
    let x_negative = x.is_negative();
    let x_abs = x.abs();

    let mut term = Dec::one();
    let mut sum = Dec::one();
    let mut negative = false;

    for i in 1..=MAX_POW_ITERATIONS {
        if term < *precision {
            return Ok(sum);
        }

        let k = Dec::from_u64(i as u64);
        // c = |exp - (k - 1)|, tracking the sign separately
        let signed_c = exp - &(&k - &one);
        let c_negative = signed_c.is_negative();
        let c = signed_c.abs();

        term = term.mul(&c.mul(&x_abs));
        term = term.quo(&k)?;

        if term.is_zero() {
            return Ok(sum);
        }

        if x_negative {
            negative = !negative;
        }
        if c_negative {
            negative = !negative;
        }

        sum = if negative { &sum - &term } else { &sum + &term };
    }

    if term < *precision {
        return Ok(sum);
    }

    tracing::warn!(
        "pow_approx({}, {}) did not converge after {} iterations",
        base,
        exp,
        MAX_POW_ITERATIONS
    );
    Err(CoreError::PowNonConvergence(MAX_POW_ITERATIONS))
}
