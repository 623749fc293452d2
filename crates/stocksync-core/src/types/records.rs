//! Normalized record shapes persisted by the sync pipeline.
//!
//! Field names are the wire contract with the store and must match the
//! target table columns exactly. Missing metrics are `None` (persisted as
//! NULL), never absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance rank for a market-capitalization value.
///
/// Stored as a smallint: 1 = reported by the provider, 2 = derived from the
/// shares multiplier implied by a freshly fetched market cap, 3 = derived
/// from the multiplier implied by the last stored state. NULL = unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum McapMethod {
    /// Directly reported by the provider (API or scrape fallback)
    Reported,
    /// Backfilled with `fresh_market_cap / fresh_close`
    DerivedFresh,
    /// Backfilled with `last_market_cap / last_close` from stored state
    DerivedStored,
}

impl McapMethod {
    /// Rank stored in the database.
    pub fn rank(&self) -> i16 {
        match self {
            McapMethod::Reported => 1,
            McapMethod::DerivedFresh => 2,
            McapMethod::DerivedStored => 3,
        }
    }

    /// Parse a stored rank.
    pub fn from_rank(rank: i16) -> Option<Self> {
        match rank {
            1 => Some(McapMethod::Reported),
            2 => Some(McapMethod::DerivedFresh),
            3 => Some(McapMethod::DerivedStored),
            _ => None,
        }
    }
}

/// Row identity within a market's tables.
///
/// The IDX store keys rows by ticker text, the US store by a surrogate
/// integer id. Records are built symbol-keyed; the market adapter rekeys
/// them before commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    /// Ticker text, e.g. "BBCA.JK"
    Symbol(String),
    /// Surrogate id from the US `company_stock` table
    StockId(i64),
}

impl SymbolKey {
    /// Column name this key binds to.
    pub fn column(&self) -> &'static str {
        match self {
            SymbolKey::Symbol(_) => "symbol",
            SymbolKey::StockId(_) => "stock_id",
        }
    }

    /// Ticker text, if still symbol-keyed.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            SymbolKey::Symbol(s) => Some(s),
            SymbolKey::StockId(_) => None,
        }
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKey::Symbol(s) => write!(f, "{}", s),
            SymbolKey::StockId(id) => write!(f, "#{}", id),
        }
    }
}

/// Most recently stored daily row for a symbol, read from the store.
///
/// Read-only input to the incremental resolver; the engine never mutates
/// stored state directly.
#[derive(Debug, Clone, PartialEq)]
pub struct LastDailyState {
    pub date: NaiveDate,
    pub close: Option<i64>,
    pub volume: Option<i64>,
    pub market_cap: Option<i64>,
    pub mcap_method: Option<McapMethod>,
}

/// One `(symbol, date)` daily price row.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub key: SymbolKey,
    pub date: NaiveDate,
    pub close: Option<i64>,
    pub volume: Option<i64>,
    pub market_cap: Option<i64>,
    pub mcap_method: Option<McapMethod>,
    pub updated_on: DateTime<Utc>,
}

impl DailyRecord {
    /// Whether this row carries the same observed values as a stored state.
    ///
    /// Used to drop the re-fetched boundary-date row when nothing changed.
    /// `Option` equality makes the comparison tolerate a missing market cap
    /// on either side.
    pub fn matches_state(&self, state: &LastDailyState) -> bool {
        self.close == state.close
            && self.volume == state.volume
            && self.market_cap == state.market_cap
    }
}

/// One dividend event row.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendRecord {
    pub key: SymbolKey,
    pub date: NaiveDate,
    pub dividend: f64,
    /// `dividend / mean close of the event's calendar year`; `None` for
    /// events in the current year (the yearly mean is not complete yet).
    pub dividend_yield: Option<f64>,
    pub updated_on: DateTime<Utc>,
}

/// One financial statement row: income statement, balance sheet and cash
/// flow metrics outer-joined on `(symbol, date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRecord {
    pub key: SymbolKey,
    pub date: NaiveDate,

    // Income statement
    pub total_revenue: Option<i64>,
    pub gross_income: Option<i64>,
    pub operating_income: Option<i64>,
    pub pretax_income: Option<i64>,
    pub income_taxes: Option<i64>,
    pub net_income: Option<i64>,
    pub ebit: Option<i64>,
    pub ebitda: Option<i64>,
    pub diluted_shares_outstanding: Option<i64>,
    pub interest_expense_non_operating: Option<i64>,

    // Balance sheet
    pub cash_and_short_term_investments: Option<i64>,
    pub total_assets: Option<i64>,
    pub total_non_current_assets: Option<i64>,
    pub total_liabilities: Option<i64>,
    pub total_current_liabilities: Option<i64>,
    pub total_debt: Option<i64>,
    pub stockholders_equity: Option<i64>,
    pub total_equity: Option<i64>,

    // Cash flow
    pub free_cash_flow: Option<i64>,
    pub net_operating_cash_flow: Option<i64>,

    /// Data provenance; 1 = primary provider.
    pub source: i64,
    pub updated_on: DateTime<Utc>,
}

impl FinancialRecord {
    /// An all-NULL row for the given key and statement date.
    pub fn empty(key: SymbolKey, date: NaiveDate, updated_on: DateTime<Utc>) -> Self {
        Self {
            key,
            date,
            total_revenue: None,
            gross_income: None,
            operating_income: None,
            pretax_income: None,
            income_taxes: None,
            net_income: None,
            ebit: None,
            ebitda: None,
            diluted_shares_outstanding: None,
            interest_expense_non_operating: None,
            cash_and_short_term_investments: None,
            total_assets: None,
            total_non_current_assets: None,
            total_liabilities: None,
            total_current_liabilities: None,
            total_debt: None,
            stockholders_equity: None,
            total_equity: None,
            free_cash_flow: None,
            net_operating_cash_flow: None,
            source: 1,
            updated_on,
        }
    }

    /// Monetary metric fields subject to currency conversion.
    ///
    /// Excludes `diluted_shares_outstanding` (a share count) and `source`.
    pub fn monetary_fields_mut(&mut self) -> Vec<&mut Option<i64>> {
        vec![
            &mut self.total_revenue,
            &mut self.gross_income,
            &mut self.operating_income,
            &mut self.pretax_income,
            &mut self.income_taxes,
            &mut self.net_income,
            &mut self.ebit,
            &mut self.ebitda,
            &mut self.interest_expense_non_operating,
            &mut self.cash_and_short_term_investments,
            &mut self.total_assets,
            &mut self.total_non_current_assets,
            &mut self.total_liabilities,
            &mut self.total_current_liabilities,
            &mut self.total_debt,
            &mut self.stockholders_equity,
            &mut self.total_equity,
            &mut self.free_cash_flow,
            &mut self.net_operating_cash_flow,
        ]
    }
}

/// Per-symbol key statistics row, upserted wholesale (no incremental
/// window).
#[derive(Debug, Clone, PartialEq)]
pub struct KeyStatsRecord {
    pub key: SymbolKey,
    pub forward_eps: Option<f64>,
    pub recommendation_mean: Option<f64>,
    pub employee_num: Option<i64>,
    /// Holder-category label -> ratio map, persisted as JSON.
    pub holders_breakdown: Option<serde_json::Value>,
    pub updated_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcap_method_ranks() {
        assert_eq!(McapMethod::Reported.rank(), 1);
        assert_eq!(McapMethod::from_rank(3), Some(McapMethod::DerivedStored));
        assert_eq!(McapMethod::from_rank(0), None);
    }

    #[test]
    fn test_boundary_match_tolerates_missing_mcap() {
        let state = LastDailyState {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: Some(100),
            volume: Some(500),
            market_cap: None,
            mcap_method: None,
        };
        let record = DailyRecord {
            key: SymbolKey::Symbol("BBCA.JK".to_string()),
            date: state.date,
            close: Some(100),
            volume: Some(500),
            market_cap: None,
            mcap_method: None,
            updated_on: Utc::now(),
        };
        assert!(record.matches_state(&state));
    }

    #[test]
    fn test_boundary_match_detects_correction() {
        let state = LastDailyState {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: Some(100),
            volume: Some(500),
            market_cap: Some(50_000),
            mcap_method: Some(McapMethod::Reported),
        };
        let record = DailyRecord {
            key: SymbolKey::Symbol("BBCA.JK".to_string()),
            date: state.date,
            close: Some(50), // split-adjusted
            volume: Some(500),
            market_cap: Some(50_000),
            mcap_method: Some(McapMethod::Reported),
            updated_on: Utc::now(),
        };
        assert!(!record.matches_state(&state));
    }
}
