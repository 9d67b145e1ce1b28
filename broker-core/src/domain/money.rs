//! Minor-unit integer money representation.
//!
//! Amounts are always six-decimal-place integers (micros of the settlement
//! token). Floats never appear in budget, bid, or settlement math; decimal
//! strings are parsed/formatted only here, at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BrokerError, Result};

const DECIMALS: u32 = 6;
const SCALE: i64 = 1_000_000;

/// An amount expressed in micros (1e-6) of the settlement token.
///
/// Serializes as a decimal string, not a JSON number — money never crosses
/// the wire as a float, and integers alone would lose the fixed-point
/// convention at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinorUnits(pub i64);

impl Serialize for MinorUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MinorUnits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    pub fn from_micros(micros: i64) -> Self {
        MinorUnits(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn checked_sub(self, other: MinorUnits) -> Option<MinorUnits> {
        self.0.checked_sub(other.0).map(MinorUnits)
    }

    pub fn checked_add(self, other: MinorUnits) -> Option<MinorUnits> {
        self.0.checked_add(other.0).map(MinorUnits)
    }

    /// `floor(self * rate_micros / 1_000_000)`, used for fee extraction.
    pub fn mul_rate_floor(self, rate_micros: u32) -> MinorUnits {
        let product = (self.0 as i128) * (rate_micros as i128);
        MinorUnits((product / SCALE as i128) as i64)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = (self.0 % SCALE).abs();
        write!(f, "{whole}.{frac:0width$}", width = DECIMALS as usize)
    }
}

impl FromStr for MinorUnits {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BrokerError::validation("amount string must not be empty"));
        }
        let negative = s.starts_with('-');
        let s = s.strip_prefix('-').unwrap_or(s);
        let mut parts = s.splitn(2, '.');
        let whole = parts.next().unwrap_or("0");
        let frac = parts.next().unwrap_or("");
        if frac.len() > DECIMALS as usize {
            return Err(BrokerError::validation(format!(
                "amount '{s}' has more than {DECIMALS} decimal places"
            )));
        }
        let whole: i64 = whole.parse().map_err(|_| {
            BrokerError::validation(format!("amount '{s}' is not a valid decimal number"))
        })?;
        let mut frac_digits = frac.to_string();
        while frac_digits.len() < DECIMALS as usize {
            frac_digits.push('0');
        }
        let frac_value: i64 = if frac_digits.is_empty() {
            0
        } else {
            frac_digits.parse().map_err(|_| {
                BrokerError::validation(format!("amount '{s}' is not a valid decimal number"))
            })?
        };
        let micros = whole * SCALE + frac_value;
        Ok(MinorUnits(if negative { -micros } else { micros }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_round_trip() {
        let amount: MinorUnits = "0.020".parse().unwrap();
        assert_eq!(amount.micros(), 20_000);
        assert_eq!(amount.to_string(), "0.020000");
    }

    #[test]
    fn rejects_too_many_decimals() {
        let result: Result<MinorUnits> = "0.0000001".parse();
        assert!(result.is_err());
    }

    #[test]
    fn fee_math_matches_spec_example() {
        let amount: MinorUnits = "0.010000".parse().unwrap();
        let fee = amount.mul_rate_floor(50_000); // 5% (rate expressed in parts-per-million)
        assert_eq!(fee, MinorUnits(500));
        let net = amount.checked_sub(fee).unwrap();
        assert_eq!(net, MinorUnits(9_500));
    }

    #[test]
    fn whole_numbers_parse_without_fraction() {
        let amount: MinorUnits = "2".parse().unwrap();
        assert_eq!(amount.micros(), 2_000_000);
    }

    #[test]
    fn serializes_as_a_decimal_string_not_a_number() {
        let amount: MinorUnits = "0.010000".parse().unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"0.010000\"");
        let round_tripped: MinorUnits = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped, amount);
    }
}
