//! US market adapter.
//!
//! Rows are keyed by the surrogate `stock_id` from `company_stock`, not by
//! ticker text; the symbol -> id map is loaded together with the symbol
//! list and used to rekey records before commit. The primary provider does
//! not serve US financial statements, so the financials pipeline is
//! reported as unsupported.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::store::MarketAdapter;
use stocksync_core::{CurrencyFlag, LastDailyState, Market, McapMethod, StatementPeriod, SymbolKey};

#[derive(Debug, Default)]
pub struct UsAdapter {
    /// symbol -> stock_id, filled by `list_active_symbols`.
    symbol_ids: Mutex<HashMap<String, i64>>,
}

impl UsAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketAdapter for UsAdapter {
    fn market(&self) -> Market {
        Market::Us
    }

    fn key_column(&self) -> &'static str {
        "stock_id"
    }

    fn supports_financials(&self) -> bool {
        false
    }

    async fn list_active_symbols(&self, pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT symbol, id FROM company_stock ORDER BY updated_on DESC")
                .fetch_all(pool)
                .await?;

        let symbols: Vec<String> = rows.iter().map(|(symbol, _)| symbol.clone()).collect();

        let mut ids = self.symbol_ids.lock().expect("symbol id map poisoned");
        *ids = rows.into_iter().collect();

        Ok(symbols)
    }

    async fn last_daily_states(
        &self,
        pool: &PgPool,
    ) -> Result<HashMap<String, LastDailyState>> {
        let rows: Vec<(
            String,
            NaiveDate,
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<i16>,
        )> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (cs.symbol)
                cs.symbol, d.date, d.close, d.volume, d.market_cap, d.mcap_method
            FROM daily_data d
            JOIN company_stock cs ON cs.id = d.stock_id
            ORDER BY cs.symbol, d.date DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(symbol, date, close, volume, market_cap, mcap_method)| {
                (
                    symbol,
                    LastDailyState {
                        date,
                        close,
                        volume,
                        market_cap,
                        mcap_method: mcap_method.and_then(McapMethod::from_rank),
                    },
                )
            })
            .collect())
    }

    async fn last_dates(
        &self,
        pool: &PgPool,
        table: &str,
    ) -> Result<HashMap<String, NaiveDate>> {
        let rows: Vec<(String, NaiveDate)> = sqlx::query_as(&format!(
            r#"
            SELECT cs.symbol, MAX(t.date)
            FROM {} t
            JOIN company_stock cs ON cs.id = t.stock_id
            GROUP BY cs.symbol
            "#,
            table
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn financial_symbol_dates(
        &self,
        _pool: &PgPool,
        _period: StatementPeriod,
    ) -> Result<HashMap<String, NaiveDate>> {
        Ok(HashMap::new())
    }

    async fn wsj_formats(&self, _pool: &PgPool) -> Result<HashMap<String, i16>> {
        Ok(HashMap::new())
    }

    async fn currency_flag(&self, _pool: &PgPool, _symbol: &str) -> Result<Option<CurrencyFlag>> {
        Ok(None)
    }

    async fn store_currency_flag(
        &self,
        _pool: &PgPool,
        _symbol: &str,
        _flag: CurrencyFlag,
    ) -> Result<()> {
        Ok(())
    }

    fn rekey(&self, key: &SymbolKey) -> Option<SymbolKey> {
        match key {
            SymbolKey::Symbol(symbol) => self
                .symbol_ids
                .lock()
                .expect("symbol id map poisoned")
                .get(symbol)
                .map(|id| SymbolKey::StockId(*id)),
            SymbolKey::StockId(_) => Some(key.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rekey_maps_symbol_to_stock_id() {
        let adapter = UsAdapter::new();
        adapter
            .symbol_ids
            .lock()
            .unwrap()
            .insert("AAPL".to_string(), 42);

        let key = SymbolKey::Symbol("AAPL".to_string());
        assert_eq!(adapter.rekey(&key), Some(SymbolKey::StockId(42)));
    }

    #[test]
    fn test_rekey_unknown_symbol_is_none() {
        let adapter = UsAdapter::new();
        let key = SymbolKey::Symbol("ZZZZ".to_string());
        assert_eq!(adapter.rekey(&key), None);
    }
}
