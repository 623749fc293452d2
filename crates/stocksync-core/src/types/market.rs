//! Market and reporting-currency classification.
//!
//! This module defines the market-level types:
//! - `Market` - which exchange context a sync run targets (IDX or US)
//! - `CurrencyFlag` - a symbol's financial reporting currency
//! - `StatementPeriod` - annual vs quarterly financial statements

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange context a sync run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// Indonesia Stock Exchange
    Idx,
    /// US stock market
    Us,
}

impl Market {
    /// Base currency records are persisted in for this market.
    pub fn base_currency(&self) -> &'static str {
        match self {
            Market::Idx => "IDR",
            Market::Us => "USD",
        }
    }

    /// Base currency as a classification flag.
    pub fn base_flag(&self) -> CurrencyFlag {
        match self {
            Market::Idx => CurrencyFlag::Idr,
            Market::Us => CurrencyFlag::Usd,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Idx => write!(f, "idx"),
            Market::Us => write!(f, "us"),
        }
    }
}

impl std::str::FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idx" | "id" => Ok(Market::Idx),
            "us" => Ok(Market::Us),
            _ => Err(format!("Unknown market: {}", s)),
        }
    }
}

/// A symbol's financial reporting currency.
///
/// Resolved lazily per symbol (stored flag first, provider info second) and
/// cached for the duration of a run. Persisted in the store as an integer
/// code: 1 = IDR, 2 = USD, -2 = resolved but unidentified. An unset column
/// (NULL or -1) maps to `None` at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyFlag {
    /// Reports in Indonesian rupiah
    Idr,
    /// Reports in US dollars
    Usd,
    /// Resolved, but not a currency the platform recognizes
    Unknown,
}

impl CurrencyFlag {
    /// Integer code used by the store.
    pub fn code(&self) -> i16 {
        match self {
            CurrencyFlag::Idr => 1,
            CurrencyFlag::Usd => 2,
            CurrencyFlag::Unknown => -2,
        }
    }

    /// Parse a stored integer code. `None`/`-1` mean "not yet resolved".
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(CurrencyFlag::Idr),
            2 => Some(CurrencyFlag::Usd),
            -2 => Some(CurrencyFlag::Unknown),
            _ => None,
        }
    }

    /// Classify the provider's `financialCurrency` string.
    pub fn from_provider(currency: &str) -> Self {
        match currency.to_uppercase().as_str() {
            "IDR" => CurrencyFlag::Idr,
            "USD" => CurrencyFlag::Usd,
            _ => CurrencyFlag::Unknown,
        }
    }
}

impl fmt::Display for CurrencyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyFlag::Idr => write!(f, "IDR"),
            CurrencyFlag::Usd => write!(f, "USD"),
            CurrencyFlag::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Financial statement reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementPeriod {
    Annual,
    Quarterly,
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementPeriod::Annual => write!(f, "annual"),
            StatementPeriod::Quarterly => write!(f, "quarterly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_from_str() {
        assert_eq!("idx".parse::<Market>().unwrap(), Market::Idx);
        assert_eq!("US".parse::<Market>().unwrap(), Market::Us);
        assert!("kr".parse::<Market>().is_err());
    }

    #[test]
    fn test_currency_flag_codes() {
        assert_eq!(CurrencyFlag::Idr.code(), 1);
        assert_eq!(CurrencyFlag::from_code(2), Some(CurrencyFlag::Usd));
        assert_eq!(CurrencyFlag::from_code(-1), None);
        assert_eq!(CurrencyFlag::from_code(-2), Some(CurrencyFlag::Unknown));
    }

    #[test]
    fn test_currency_flag_from_provider() {
        assert_eq!(CurrencyFlag::from_provider("usd"), CurrencyFlag::Usd);
        assert_eq!(CurrencyFlag::from_provider("IDR"), CurrencyFlag::Idr);
        assert_eq!(CurrencyFlag::from_provider("JPY"), CurrencyFlag::Unknown);
    }
}
