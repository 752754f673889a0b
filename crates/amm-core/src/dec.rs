// amm-core/src/dec.rs

//! Signed fixed-point decimal with exactly 18 fractional digits.
//!
//! Every value is stored as an integer count of `10^-18` units, so all
//! arithmetic is exact integer arithmetic followed by one explicit rounding
//! step. Results are identical on every platform.

use crate::{Amount, CoreError, CoreResult};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Number of fractional digits
pub const PRECISION: u32 = 18;

const PRECISION_MULTIPLIER: u64 = 1_000_000_000_000_000_000;

fn multiplier() -> BigInt {
    BigInt::from(PRECISION_MULTIPLIER)
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u64).pow(exp)
}

/// Integer division rounding half away from zero
/// Raw values wider than this many bits are rejected by checked operations
pub const MAX_RAW_BITS: u64 = 256;

fn check_magnitude(value: &Dec) -> CoreResult<()> {
    if value.0.magnitude().bits() > MAX_RAW_BITS {
        return Err(CoreError::Overflow(format!("{} exceeds 2^256 raw units", value)));
    }
    Ok(())
}

fn div_round(num: &BigInt, den: &BigInt) -> BigInt {
    let quotient = num / den;
    let remainder = num % den;
    if remainder.is_zero() {
        return quotient;
    }
    let twice = remainder.abs() * 2u32;
    if twice >= den.abs() {
        if (num.sign() == Sign::Minus) == (den.sign() == Sign::Minus) {
            quotient + 1
        } else {
            quotient - 1
        }
    } else {
        quotient
    }
}

/// Integer division rounding toward positive infinity
fn div_ceil(num: &BigInt, den: &BigInt) -> BigInt {
    let quotient = num / den;
    let remainder = num % den;
    if !remainder.is_zero() && (num.sign() == Sign::Minus) == (den.sign() == Sign::Minus) {
        quotient + 1
    } else {
        quotient
    }
}

/// Fixed-point decimal (18 fractional digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Dec(BigInt);

impl Dec {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn one() -> Self {
        Self(multiplier())
    }

    /// Build from raw `10^-18` units
    pub fn from_raw(raw: BigInt) -> Self {
        Self(raw)
    }

    /// Raw `10^-18` units
    pub fn raw(&self) -> &BigInt {
        &self.0
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigInt::from(value) * multiplier())
    }

    pub fn from_int(value: &BigInt) -> Self {
        Self(value * multiplier())
    }

    pub fn from_amount(amount: &Amount) -> Self {
        Self(BigInt::from_biguint(Sign::Plus, amount.inner().clone()) * multiplier())
    }

    /// `value * 10^-prec`, e.g. `new_with_prec(3, 3)` is `0.003`
    pub fn new_with_prec(value: i64, prec: u32) -> CoreResult<Self> {
        if prec > PRECISION {
            return Err(CoreError::ParseError(format!(
                "precision {} exceeds {} digits",
                prec, PRECISION
            )));
        }
        Ok(Self(BigInt::from(value) * pow10(PRECISION - prec)))
    }

    /// `numerator / denominator`, rounded
    pub fn from_ratio(numerator: u64, denominator: u64) -> CoreResult<Self> {
        Self::from_u64(numerator).quo(&Self::from_u64(denominator))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Dec {
        Dec(self.0.abs())
    }

    /// Product, rounded half away from zero
    pub fn mul(&self, other: &Dec) -> Dec {
        Dec(div_round(&(&self.0 * &other.0), &multiplier()))
    }

    /// Product, truncated toward zero
    pub fn mul_truncate(&self, other: &Dec) -> Dec {
        Dec((&self.0 * &other.0) / multiplier())
    }

    /// Product, rounded toward positive infinity
    pub fn mul_round_up(&self, other: &Dec) -> Dec {
        Dec(div_ceil(&(&self.0 * &other.0), &multiplier()))
    }

    /// Quotient, rounded half away from zero
    pub fn quo(&self, other: &Dec) -> CoreResult<Dec> {
        if other.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        Ok(Dec(div_round(&(&self.0 * multiplier()), &other.0)))
    }

    /// Quotient, truncated toward zero
    pub fn quo_truncate(&self, other: &Dec) -> CoreResult<Dec> {
        if other.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        Ok(Dec((&self.0 * multiplier()) / &other.0))
    }

    /// Quotient, rounded toward positive infinity
    pub fn quo_round_up(&self, other: &Dec) -> CoreResult<Dec> {
        if other.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        Ok(Dec(div_ceil(&(&self.0 * multiplier()), &other.0)))
    }

    /// Integer power by repeated squaring; every step rounds like [`Dec::mul`]
    pub fn pow_int(&self, mut exp: u64) -> CoreResult<Dec> {
        let mut base = self.clone();
        let mut result = Dec::one();
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul(&base);
                check_magnitude(&result)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = base.mul(&base);
                check_magnitude(&base)?;
            }
        }
        Ok(result)
    }

    /// Integer part, truncated toward zero
    pub fn truncate_int(&self) -> BigInt {
        &self.0 / multiplier()
    }

    /// Integer part as a decimal value
    pub fn truncate_dec(&self) -> Dec {
        Dec(self.truncate_int() * multiplier())
    }

    /// Smallest integer not below this value
    pub fn ceil_int(&self) -> BigInt {
        div_ceil(&self.0, &multiplier())
    }

    /// Truncated non-negative amount
    pub fn truncate_amount(&self) -> CoreResult<Amount> {
        to_amount(self.truncate_int(), self)
    }

    /// Rounded-up non-negative amount
    pub fn ceil_amount(&self) -> CoreResult<Amount> {
        to_amount(self.ceil_int(), self)
    }

    /// Lossy view for logging and metrics only
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN) / PRECISION_MULTIPLIER as f64
    }
}

fn to_amount(value: BigInt, original: &Dec) -> CoreResult<Amount> {
    match value.to_biguint() {
        Some(v) => Ok(Amount::new(v)),
        None => Err(CoreError::NegativeValue(original.to_string())),
    }
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, other: Dec) -> Dec {
        Dec(self.0 + other.0)
    }
}

impl<'a> Add<&'a Dec> for &'a Dec {
    type Output = Dec;

    fn add(self, other: &'a Dec) -> Dec {
        Dec(&self.0 + &other.0)
    }
}

impl Sub for Dec {
    type Output = Dec;

    fn sub(self, other: Dec) -> Dec {
        Dec(self.0 - other.0)
    }
}

impl<'a> Sub<&'a Dec> for &'a Dec {
    type Output = Dec;

    fn sub(self, other: &'a Dec) -> Dec {
        Dec(&self.0 - &other.0)
    }
}

impl Neg for Dec {
    type Output = Dec;

    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}

impl PartialEq<Amount> for Dec {
    fn eq(&self, other: &Amount) -> bool {
        *self == Dec::from_amount(other)
    }
}

impl PartialOrd<Amount> for Dec {
    fn partial_cmp(&self, other: &Amount) -> Option<Ordering> {
        Some(self.cmp(&Dec::from_amount(other)))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.abs();
        let integer = &abs / multiplier();
        let fraction = &abs % multiplier();
        let sign = if self.0.is_negative() { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0>width$}",
            sign,
            integer,
            fraction.to_string(),
            width = PRECISION as usize
        )
    }
}

impl FromStr for Dec {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let err = || CoreError::ParseError(format!("invalid decimal '{}'", s));
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) || body.ends_with('.') {
            return Err(err());
        }
        if frac_part.len() > PRECISION as usize {
            return Err(CoreError::ParseError(format!(
                "decimal '{}' has more than {} fractional digits",
                s, PRECISION
            )));
        }
        let int_value = BigUint::from_str(int_part).map_err(|_| err())?;
        let frac_value = if frac_part.is_empty() {
            BigUint::zero()
        } else {
            BigUint::from_str(frac_part).map_err(|_| err())?
        };
        let scale = pow10(PRECISION - frac_part.len() as u32);
        let raw = BigInt::from_biguint(Sign::Plus, int_value) * multiplier()
            + BigInt::from_biguint(Sign::Plus, frac_value) * scale;
        Ok(Dec(if negative { -raw } else { raw }))
    }
}

impl TryFrom<rust_decimal::Decimal> for Dec {
    type Error = CoreError;

    fn try_from(value: rust_decimal::Decimal) -> CoreResult<Self> {
        let mantissa = BigInt::from(value.mantissa());
        let scale = value.scale();
        if scale <= PRECISION {
            return Ok(Dec(mantissa * pow10(PRECISION - scale)));
        }
        let divisor = pow10(scale - PRECISION);
        if !(&mantissa % &divisor).is_zero() {
            return Err(CoreError::ParseError(format!(
                "decimal {} has more than {} fractional digits",
                value, PRECISION
            )));
        }
        Ok(Dec(mantissa / divisor))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dec::from_str(&s).map_err(serde::de::Error::custom)
    }
}
