//! Money amounts stored as integer minor units (paise, cents).
//!
//! Balances are sums of many amounts, so they never touch floating point.

use crate::errors::{Error, Result};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::Neg,
    str::FromStr,
};

/// Signed amount in minor units.
///
/// ```
/// use khata_ledger::core::money::Money;
///
/// let amount: Money = "12.5".parse().unwrap();
/// assert_eq!(amount.minor_units(), 1250);
/// assert_eq!(amount.to_string(), "12.50");
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    DeriveValueType,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Raw value in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl FromStr for Money {
    type Err = Error;

    /// Parses a decimal string such as `"12"`, `"12.5"`, `"-0.01"`.
    /// `,` is accepted as the decimal separator; more than two decimals are rejected.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::validation("amount", format!("{reason}: {s:?}"));

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let rest = rest.replace(',', ".");
        let (units_str, fraction_str) = match rest.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (rest.as_str(), ""),
        };

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a number"));
        }
        if !fraction_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a number"));
        }

        let units: i64 = units_str.parse().map_err(|_| invalid("too large"))?;
        let fraction: i64 = match fraction_str.len() {
            0 => 0,
            1 => fraction_str.parse::<i64>().map_err(|_| invalid("not a number"))? * 10,
            2 => fraction_str.parse().map_err(|_| invalid("not a number"))?,
            _ => return Err(invalid("more than two decimals")),
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(|| invalid("too large"))?;

        Ok(Self(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(7).to_string(), "0.07");
        assert_eq!(Money::new(50_000).to_string(), "500.00");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn test_parse() {
        assert_eq!("10".parse::<Money>().unwrap(), Money::new(1000));
        assert_eq!("10.5".parse::<Money>().unwrap(), Money::new(1050));
        assert_eq!("10,05".parse::<Money>().unwrap(), Money::new(1005));
        assert_eq!(" -0.01 ".parse::<Money>().unwrap(), Money::new(-1));
        assert_eq!("+3.".parse::<Money>().unwrap(), Money::new(300));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
        assert_eq!(
            Money::new(40).checked_add(Money::new(-100)),
            Some(Money::new(-60))
        );
        assert_eq!(Money::new(i64::MIN).checked_sub(Money::new(1)), None);
        assert_eq!(Money::new(40).checked_sub(Money::new(100)), Some(Money::new(-60)));
    }
}
