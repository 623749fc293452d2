//! Record-to-query binding.
//!
//! Each record type knows its column list and how to bind one row's worth
//! of placeholders. The committer stitches rows into multi-row
//! `INSERT ... ON CONFLICT` statements; column names here are the wire
//! contract with the store.

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use stocksync_core::{DailyRecord, DividendRecord, FinancialRecord, KeyStatsRecord, SymbolKey};

/// Alias for the sqlx query type rows bind into.
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A record that can be upserted in bulk.
pub trait UpsertRow {
    /// Column names, key column first. All rows of one batch share the
    /// same shape.
    fn columns(&self) -> Vec<&'static str>;

    /// Bind this row's values in column order.
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;

    /// Row identity, for market-specific rekeying.
    fn key(&self) -> &SymbolKey;

    /// Replace the row identity (ticker -> `stock_id`).
    fn set_key(&mut self, key: SymbolKey);
}

fn bind_key<'q>(key: &SymbolKey, query: PgQuery<'q>) -> PgQuery<'q> {
    match key {
        SymbolKey::Symbol(symbol) => query.bind(symbol.clone()),
        SymbolKey::StockId(id) => query.bind(*id),
    }
}

impl UpsertRow for DailyRecord {
    fn columns(&self) -> Vec<&'static str> {
        vec![
            self.key.column(),
            "date",
            "close",
            "volume",
            "market_cap",
            "mcap_method",
            "updated_on",
        ]
    }

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        bind_key(&self.key, query)
            .bind(self.date)
            .bind(self.close)
            .bind(self.volume)
            .bind(self.market_cap)
            .bind(self.mcap_method.map(|m| m.rank()))
            .bind(self.updated_on)
    }

    fn key(&self) -> &SymbolKey {
        &self.key
    }

    fn set_key(&mut self, key: SymbolKey) {
        self.key = key;
    }
}

impl UpsertRow for DividendRecord {
    fn columns(&self) -> Vec<&'static str> {
        vec![
            self.key.column(),
            "date",
            "dividend",
            "yield",
            "updated_on",
        ]
    }

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        bind_key(&self.key, query)
            .bind(self.date)
            .bind(self.dividend)
            .bind(self.dividend_yield)
            .bind(self.updated_on)
    }

    fn key(&self) -> &SymbolKey {
        &self.key
    }

    fn set_key(&mut self, key: SymbolKey) {
        self.key = key;
    }
}

impl UpsertRow for KeyStatsRecord {
    fn columns(&self) -> Vec<&'static str> {
        vec![
            self.key.column(),
            "forward_eps",
            "recommendation_mean",
            "employee_num",
            "holders_breakdown",
            "updated_on",
        ]
    }

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        bind_key(&self.key, query)
            .bind(self.forward_eps)
            .bind(self.recommendation_mean)
            .bind(self.employee_num)
            .bind(self.holders_breakdown.clone())
            .bind(self.updated_on)
    }

    fn key(&self) -> &SymbolKey {
        &self.key
    }

    fn set_key(&mut self, key: SymbolKey) {
        self.key = key;
    }
}

impl UpsertRow for FinancialRecord {
    fn columns(&self) -> Vec<&'static str> {
        vec![
            self.key.column(),
            "date",
            "total_revenue",
            "gross_income",
            "operating_income",
            "pretax_income",
            "income_taxes",
            "net_income",
            "ebit",
            "ebitda",
            "diluted_shares_outstanding",
            "interest_expense_non_operating",
            "cash_and_short_term_investments",
            "total_assets",
            "total_non_current_assets",
            "total_liabilities",
            "total_current_liabilities",
            "total_debt",
            "stockholders_equity",
            "total_equity",
            "free_cash_flow",
            "net_operating_cash_flow",
            "source",
            "updated_on",
        ]
    }

    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        bind_key(&self.key, query)
            .bind(self.date)
            .bind(self.total_revenue)
            .bind(self.gross_income)
            .bind(self.operating_income)
            .bind(self.pretax_income)
            .bind(self.income_taxes)
            .bind(self.net_income)
            .bind(self.ebit)
            .bind(self.ebitda)
            .bind(self.diluted_shares_outstanding)
            .bind(self.interest_expense_non_operating)
            .bind(self.cash_and_short_term_investments)
            .bind(self.total_assets)
            .bind(self.total_non_current_assets)
            .bind(self.total_liabilities)
            .bind(self.total_current_liabilities)
            .bind(self.total_debt)
            .bind(self.stockholders_equity)
            .bind(self.total_equity)
            .bind(self.free_cash_flow)
            .bind(self.net_operating_cash_flow)
            .bind(self.source)
            .bind(self.updated_on)
    }

    fn key(&self) -> &SymbolKey {
        &self.key
    }

    fn set_key(&mut self, key: SymbolKey) {
        self.key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_key_column_follows_rekeying() {
        let mut record = DailyRecord {
            key: SymbolKey::Symbol("AAPL".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: Some(100),
            volume: Some(1),
            market_cap: None,
            mcap_method: None,
            updated_on: Utc::now(),
        };
        assert_eq!(record.columns()[0], "symbol");

        record.key = SymbolKey::StockId(42);
        assert_eq!(record.columns()[0], "stock_id");
    }

    #[test]
    fn test_dividend_columns_use_wire_names() {
        let record = DividendRecord {
            key: SymbolKey::Symbol("BBCA.JK".to_string()),
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            dividend: 50.0,
            dividend_yield: Some(0.05),
            updated_on: Utc::now(),
        };
        assert_eq!(
            record.columns(),
            vec!["symbol", "date", "dividend", "yield", "updated_on"]
        );
    }
}
