//! IDX (Indonesia) market adapter.
//!
//! Ticker-keyed tables (`idx_daily_data`, `idx_dividend`, `idx_key_stats`,
//! `idx_financials_annual`, `idx_financials_quarterly`); symbols and
//! per-symbol metadata (WSJ format flag, reporting-currency flag) live in
//! the company profile tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::Result;
use crate::store::MarketAdapter;
use stocksync_core::{CurrencyFlag, LastDailyState, Market, McapMethod, StatementPeriod, SymbolKey};

/// Active-symbol roster and per-symbol flags.
const PROFILE_TABLE: &str = "idx_active_company_profile";
/// Full profile table carrying the persisted currency flag.
const COMPANY_TABLE: &str = "idx_company_profile";

#[derive(Debug, Default)]
pub struct IdxAdapter;

impl IdxAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Financials table for the period.
    pub fn financials_table(period: StatementPeriod) -> &'static str {
        match period {
            StatementPeriod::Annual => "idx_financials_annual",
            StatementPeriod::Quarterly => "idx_financials_quarterly",
        }
    }
}

#[async_trait]
impl MarketAdapter for IdxAdapter {
    fn market(&self) -> Market {
        Market::Idx
    }

    fn key_column(&self) -> &'static str {
        "symbol"
    }

    fn supports_financials(&self) -> bool {
        true
    }

    async fn list_active_symbols(&self, pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT symbol FROM {} ORDER BY updated_on ASC",
            PROFILE_TABLE
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(symbol,)| symbol).collect())
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
            SELECT DISTINCT ON (symbol)
                symbol, date, close, volume, market_cap, mcap_method
            FROM idx_daily_data
            ORDER BY symbol, date DESC
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
            "SELECT symbol, MAX(date) FROM {} GROUP BY symbol",
            table
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn financial_symbol_dates(
        &self,
        pool: &PgPool,
        period: StatementPeriod,
    ) -> Result<HashMap<String, NaiveDate>> {
        let rows: Vec<(String, NaiveDate)> = sqlx::query_as(&format!(
            "SELECT symbol, MAX(date) FROM {} WHERE source = 1 GROUP BY symbol",
            Self::financials_table(period)
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn wsj_formats(&self, pool: &PgPool) -> Result<HashMap<String, i16>> {
        let rows: Vec<(String, Option<i16>)> = sqlx::query_as(&format!(
            "SELECT symbol, wsj_format FROM {}",
            PROFILE_TABLE
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(symbol, format)| format.map(|f| (symbol, f)))
            .collect())
    }

    async fn currency_flag(&self, pool: &PgPool, symbol: &str) -> Result<Option<CurrencyFlag>> {
        let row: Option<(Option<i16>,)> = sqlx::query_as(&format!(
            "SELECT yf_currency FROM {} WHERE symbol = $1",
            COMPANY_TABLE
        ))
        .bind(symbol)
        .fetch_optional(pool)
        .await?;

        Ok(row
            .and_then(|(code,)| code)
            .and_then(CurrencyFlag::from_code))
    }

    async fn store_currency_flag(
        &self,
        pool: &PgPool,
        symbol: &str,
        flag: CurrencyFlag,
    ) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET yf_currency = $2 WHERE symbol = $1",
            COMPANY_TABLE
        ))
        .bind(symbol)
        .bind(flag.code())
        .execute(pool)
        .await?;

        Ok(())
    }

    fn rekey(&self, key: &SymbolKey) -> Option<SymbolKey> {
        Some(key.clone())
    }
}
