// amm-core/src/types.rs

use crate::{CoreError, CoreResult};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Block number/height
pub type BlockNumber = u64;

/// Pool identifier, assigned once at creation and never reused
pub type PoolId = u64;

/// Token amount (using BigUint for arbitrary precision)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(BigUint);

impl Amount {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// `tokens * 10^18` base units
    pub fn from_tokens(tokens: u64) -> Self {
        Self(BigUint::from(tokens) * BigUint::from(10u64).pow(18))
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn into_inner(self) -> BigUint {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Lossy view for logging and metrics only
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    /// `floor(self * numerator / denominator)`
    pub fn mul_div_floor(&self, numerator: &Amount, denominator: &Amount) -> CoreResult<Amount> {
        if denominator.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        Ok(Amount(&self.0 * &numerator.0 / &denominator.0))
    }

    /// `ceil(self * numerator / denominator)`
    pub fn mul_div_ceil(&self, numerator: &Amount, denominator: &Amount) -> CoreResult<Amount> {
        if denominator.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        let product = &self.0 * &numerator.0;
        let quotient = &product / &denominator.0;
        if &quotient * &denominator.0 == product {
            Ok(Amount(quotient))
        } else {
            Ok(Amount(quotient + 1u32))
        }
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, other: &'a Amount) -> Amount {
        Amount(&self.0 + &other.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::ParseError(format!("invalid amount '{}'", s)));
        }
        BigUint::from_str(s)
            .map(Amount)
            .map_err(|e| CoreError::ParseError(e.to_string()))
    }
}

// Amounts travel as decimal strings so JSON consumers never lose precision.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Check a denomination against `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> CoreResult<()> {
    let bytes = denom.as_bytes();
    if bytes.len() < 3 || bytes.len() > 128 {
        return Err(CoreError::ParseError(format!(
            "denom '{}' must be 3-128 characters",
            denom
        )));
    }
    if !bytes[0].is_ascii_alphabetic() {
        return Err(CoreError::ParseError(format!(
            "denom '{}' must start with a letter",
            denom
        )));
    }
    let valid = bytes[1..]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if !valid {
        return Err(CoreError::ParseError(format!(
            "denom '{}' contains invalid characters",
            denom
        )));
    }
    Ok(())
}

/// An amount of a single denomination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoreError;

    /// Parse `"<amount><denom>"`, e.g. `100stake2`
    fn from_str(s: &str) -> CoreResult<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoreError::ParseError(format!("coin '{}' has no denom", s)))?;
        let (amount, denom) = s.split_at(split);
        let amount = Amount::from_str(amount)?;
        validate_denom(denom)?;
        Ok(Coin::new(denom, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from_u64(100);
        let b = Amount::from_u64(50);

        let sum = &a + &b;
        assert_eq!(sum, Amount::from_u64(150));

        let diff = sum.checked_sub(&b).unwrap();
        assert_eq!(diff, Amount::from_u64(100));
        assert!(b.checked_sub(&sum).is_none());
    }

    #[test]
    fn test_amount_underflow() {
        let a = Amount::from_u64(50);
        let b = Amount::from_u64(100);

        assert!(a.checked_sub(&b).is_none());
    }

    #[test]
    fn test_mul_div_rounding() {
        let balance = Amount::from_u64(1000);
        let shares = Amount::from_u64(1);
        let total = Amount::from_u64(3);

        assert_eq!(balance.mul_div_floor(&shares, &total).unwrap(), Amount::from_u64(333));
        assert_eq!(balance.mul_div_ceil(&shares, &total).unwrap(), Amount::from_u64(334));
        assert_eq!(
            balance.mul_div_ceil(&Amount::from_u64(3), &total).unwrap(),
            Amount::from_u64(1000)
        );
        assert!(balance.mul_div_floor(&shares, &Amount::zero()).is_err());
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::from_tokens(3);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"3000000000000000000\"");

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_parse_coin() {
        let coin: Coin = "100stake2".parse().unwrap();
        assert_eq!(coin.denom, "stake2");
        assert_eq!(coin.amount, Amount::from_u64(100));
        assert_eq!(coin.to_string(), "100stake2");

        let share: Coin = "5gamm/pool/1".parse().unwrap();
        assert_eq!(share.denom, "gamm/pool/1");
    }

    #[test]
    fn test_parse_coin_rejects_garbage() {
        assert!("stake".parse::<Coin>().is_err());
        assert!("100".parse::<Coin>().is_err());
        assert!("10x".parse::<Coin>().is_err());
        assert!("10 stake".parse::<Coin>().is_err());
    }

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("uosmo").is_ok());
        assert!(validate_denom("ibc/27394FB0").is_ok());
        assert!(validate_denom("1abc").is_err());
        assert!(validate_denom("ab").is_err());
    }
}
