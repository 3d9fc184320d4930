//! Amounts in minor currency units.
//!
//! The gateway only deals in integer minor units (pence, cents). Order totals
//! are decimals in major units, so conversion depends on the currency's
//! ISO-4217 exponent.

use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Number of decimal places used by an ISO-4217 currency, alphabetic or
/// numeric code. Unknown currencies use 2.
pub fn currency_exponent(currency: &str) -> u32 {
    match currency.trim().to_ascii_uppercase().as_str() {
        "BIF" | "108" | "CLP" | "152" | "DJF" | "262" | "GNF" | "324" | "ISK" | "352"
        | "JPY" | "392" | "KMF" | "174" | "KRW" | "410" | "PYG" | "600" | "RWF" | "646"
        | "UGX" | "800" | "UYI" | "940" | "VND" | "704" | "VUV" | "548" | "XAF" | "950"
        | "XOF" | "952" | "XPF" | "953" => 0,
        "BHD" | "048" | "IQD" | "368" | "JOD" | "400" | "KWD" | "414" | "LYD" | "434"
        | "OMR" | "512" | "TND" | "788" => 3,
        _ => 2,
    }
}

/// Largest exponent any ISO-4217 currency uses, with headroom.
pub const MAX_CURRENCY_EXPONENT: u32 = 4;

/// A non-negative amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinorAmount(pub u64);

impl MinorAmount {
    /// Converts a major-unit amount, rounding half away from zero.
    pub fn from_major(amount: Decimal, currency: &str) -> Result<Self> {
        let factor = Decimal::from(10u64.pow(currency_exponent(currency)));
        let scaled = amount
            .checked_mul(factor)
            .ok_or_else(|| Error::AmountOutOfRange(amount.to_string()))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        if scaled.is_sign_negative() && !scaled.is_zero() {
            return Err(Error::AmountOutOfRange(amount.to_string()));
        }
        scaled
            .to_u64()
            .map(MinorAmount)
            .ok_or_else(|| Error::AmountOutOfRange(amount.to_string()))
    }

    pub fn to_major(self, exponent: u32) -> Result<Decimal> {
        Decimal::try_from_i128_with_scale(i128::from(self.0), exponent).map_err(|_| {
            Error::InvalidField {
                field: "currencyExponent",
                value: exponent.to_string(),
            }
        })
    }

    /// Formats the amount with exactly `exponent` decimals.
    pub fn to_major_string(self, exponent: u32) -> Result<String> {
        self.to_major(exponent).map(|amount| amount.to_string())
    }

    pub fn saturating_sub(self, other: MinorAmount) -> MinorAmount {
        MinorAmount(self.0.saturating_sub(other.0))
    }
}

impl From<u64> for MinorAmount {
    fn from(value: u64) -> Self {
        MinorAmount(value)
    }
}

impl Display for MinorAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MinorAmount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(MinorAmount)
            .map_err(|_| Error::InvalidField {
                field: "amount",
                value: s.to_owned(),
            })
    }
}

impl Serialize for MinorAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MinorAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn converts_by_currency_exponent() {
        assert_eq!(MinorAmount::from_major(dec("10.01"), "GBP").unwrap(), MinorAmount(1001));
        assert_eq!(MinorAmount::from_major(dec("10.01"), "826").unwrap(), MinorAmount(1001));
        assert_eq!(MinorAmount::from_major(dec("1500"), "JPY").unwrap(), MinorAmount(1500));
        assert_eq!(MinorAmount::from_major(dec("1.2345"), "KWD").unwrap(), MinorAmount(1235));
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(MinorAmount::from_major(dec("0.005"), "GBP").unwrap(), MinorAmount(1));
        assert_eq!(MinorAmount::from_major(dec("0.004"), "GBP").unwrap(), MinorAmount(0));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(MinorAmount::from_major(dec("-1.00"), "GBP").is_err());
    }

    #[test]
    fn formats_major_units() {
        assert_eq!(MinorAmount(1001).to_major_string(2).unwrap(), "10.01");
        assert_eq!(MinorAmount(5).to_major_string(2).unwrap(), "0.05");
        assert_eq!(MinorAmount(1500).to_major_string(0).unwrap(), "1500");
        assert_eq!(MinorAmount(1235).to_major_string(3).unwrap(), "1.235");
    }

    #[test]
    fn rejects_scales_decimal_cannot_hold() {
        assert!(matches!(
            MinorAmount(1001).to_major(29),
            Err(Error::InvalidField { field: "currencyExponent", .. })
        ));
        assert!(MinorAmount(1001).to_major(28).is_ok());
    }
}
