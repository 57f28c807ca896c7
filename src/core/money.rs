//! Fixed-point currency amounts.
//!
//! Amounts are held as integer minor units (cents) so that repeated additions never drift.
//! At the edges they convert to and from `rust_decimal::Decimal`, which is also how they
//! appear in JSON (a plain decimal number with at most two fractional digits).

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::DeriveValueType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of fractional digits carried by every amount.
pub const SCALE: u32 = 2;

/// A currency amount in minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, DeriveValueType)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Builds an amount from minor units (cents).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Builds an amount from whole currency units.
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(100))
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether the amount is above zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Addition that reports overflow instead of wrapping.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `self - other`, floored at zero.
    #[must_use]
    pub fn saturating_remaining(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }

    /// The amount as a two-place decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }

    /// Sums amounts, failing on overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts.into_iter().try_fold(Self::ZERO, |acc, amount| {
            acc.checked_add(amount).ok_or(Error::InvalidAmount {
                amount: amount.to_decimal(),
            })
        })
    }
}

impl TryFrom<Decimal> for Money {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        let invalid = || Error::InvalidAmount { amount: value };
        let scaled = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(invalid)?;
        if !scaled.fract().is_zero() {
            return Err(invalid());
        }
        scaled.to_i64().map(Self).ok_or_else(invalid)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_conversion_is_exact() {
        let amount = Money::try_from(Decimal::from_str("400000.50").unwrap()).unwrap();
        assert_eq!(amount.minor(), 40_000_050);
        assert_eq!(amount.to_decimal(), Decimal::from_str("400000.50").unwrap());
        assert_eq!(amount.to_string(), "400000.50");
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        let result = Money::try_from(Decimal::from_str("10.005").unwrap());
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn test_repeated_tenths_do_not_drift() {
        let tenth = Money::try_from(Decimal::from_str("0.1").unwrap()).unwrap();
        let total = Money::try_sum(std::iter::repeat_n(tenth, 1000)).unwrap();
        assert_eq!(total, Money::from_major(100));
    }

    #[test]
    fn test_json_round_trip_uses_numbers() {
        let json = serde_json::to_string(&Money::from_minor(12_345)).unwrap();
        assert_eq!(json, "123.45");
        let back: Money = serde_json::from_str("600000").unwrap();
        assert_eq!(back, Money::from_major(600_000));
        assert!(serde_json::from_str::<Money>("1.234").is_err());
    }

    #[test]
    fn test_try_sum_reports_overflow() {
        let result = Money::try_sum([Money::from_minor(i64::MAX), Money::from_minor(1)]);
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn test_extremes_saturate_instead_of_panicking() {
        assert_eq!(
            Money::from_minor(i64::MAX).saturating_remaining(Money::from_minor(i64::MIN)),
            Money::from_minor(i64::MAX)
        );
        assert_eq!(
            Money::from_minor(5).saturating_remaining(Money::from_minor(i64::MAX)),
            Money::ZERO
        );
        assert_eq!(Money::from_major(i64::MAX), Money::from_minor(i64::MAX));
    }
}
