//! Amount type for handling monetary values with an optional pound sign.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles
//! parsing values that may or may not include a `£` prefix. Everything in
//! the ledger is a single implicit currency (GBP), so the only formatting
//! concern is whether the pound sign was present.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Represents a pound amount.
///
/// This type wraps `Decimal` and provides custom serialization and
/// deserialization to handle amounts that may be formatted with or without
/// a pound sign. Display always renders two decimal places, which is the
/// shape every monetary literal in the ledger is written with.
///
/// ```
/// # use coinrow::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("£12.50").unwrap();
/// assert_eq!(amount.to_string(), "£12.50");
///
/// let bare = Amount::from_str("12.5").unwrap();
/// assert_eq!(bare.to_string(), "12.50");
/// assert_eq!(amount.value(), bare.value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value.
    value: Decimal,
    /// Whether a pound sign was parsed from, or should be written to, a `String`.
    pound: bool,
}

impl Amount {
    /// Creates a new `Amount` without a pound sign in its formatting.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            pound: false,
        }
    }

    /// Creates a new `Amount` that formats with a pound sign.
    pub const fn pounds(value: Decimal) -> Self {
        Self { value, pound: true }
    }

    /// Returns the underlying `Decimal` value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (pound, digits) = match trimmed.strip_prefix('£') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let value = Decimal::from_str(digits)?;
        Ok(Self { value, pound })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, num) = if self.value.is_sign_negative() {
            ("-", self.value.abs())
        } else {
            ("", self.value)
        };
        let symbol = if self.pound { "£" } else { "" };
        write!(f, "{sign}{symbol}{num:.2}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_pound_sign() {
        let amount = Amount::from_str("£12.50").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn test_parse_without_pound_sign() {
        let amount = Amount::from_str("12.50").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn test_parse_integer() {
        let amount = Amount::from_str("7").unwrap();
        assert_eq!(amount.to_string(), "7.00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Amount::from_str("twelve").is_err());
        assert!(Amount::from_str("£").is_err());
    }

    #[test]
    fn test_display_keeps_pound_sign() {
        let amount = Amount::from_str("£3.1").unwrap();
        assert_eq!(amount.to_string(), "£3.10");
    }

    #[test]
    fn test_display_negative() {
        let amount = Amount::pounds(Decimal::from_str("-5.00").unwrap());
        assert_eq!(amount.to_string(), "-£5.00");
    }

    #[test]
    fn test_value_equality_ignores_formatting() {
        let a = Amount::from_str("£12.50").unwrap();
        let b = Amount::from_str("12.50").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn test_serde_round_trip() {
        let amount = Amount::from_str("£42.00").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"£42.00\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
