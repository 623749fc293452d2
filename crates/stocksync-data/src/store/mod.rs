//! Store abstraction over the relational backend.
//!
//! The two markets share one engine; everything market-specific lives
//! behind [`MarketAdapter`]: symbol listing, last-known-state queries, key
//! mapping (ticker text vs surrogate `stock_id`), table names and currency
//! flag persistence. The engine never mutates stored state directly - it
//! reads snapshots here and proposes upserts through the
//! [`BatchUpsertCommitter`](upsert::BatchUpsertCommitter).

pub mod bind;
pub mod idx;
pub mod upsert;
pub mod us;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::Result;
use stocksync_core::{CurrencyFlag, LastDailyState, Market, StatementPeriod, SymbolKey};

pub use bind::UpsertRow;
pub use idx::IdxAdapter;
pub use upsert::{BatchUpsertCommitter, RetryPolicy};
pub use us::UsAdapter;

/// Market-specific store capabilities consumed by the sync engine.
#[async_trait]
pub trait MarketAdapter: Send + Sync {
    fn market(&self) -> Market;

    /// Column the market keys rows by (`symbol` or `stock_id`).
    fn key_column(&self) -> &'static str;

    /// Whether the primary provider serves financial statements for this
    /// market.
    fn supports_financials(&self) -> bool;

    /// Active symbols, ordered by last profile update (paging is done by
    /// the caller).
    async fn list_active_symbols(&self, pool: &PgPool) -> Result<Vec<String>>;

    /// Most recent stored daily row per symbol.
    async fn last_daily_states(&self, pool: &PgPool)
        -> Result<HashMap<String, LastDailyState>>;

    /// Most recent stored date per symbol in the given table.
    async fn last_dates(&self, pool: &PgPool, table: &str)
        -> Result<HashMap<String, NaiveDate>>;

    /// Last primary-provider statement date per symbol; symbols absent here
    /// are excluded from a financials run.
    async fn financial_symbol_dates(
        &self,
        pool: &PgPool,
        period: StatementPeriod,
    ) -> Result<HashMap<String, NaiveDate>>;

    /// Per-symbol statement format flags (empty where not applicable).
    async fn wsj_formats(&self, pool: &PgPool) -> Result<HashMap<String, i16>>;

    /// Stored reporting-currency flag, `None` when not yet resolved.
    async fn currency_flag(&self, pool: &PgPool, symbol: &str) -> Result<Option<CurrencyFlag>>;

    /// Persist a freshly discovered reporting-currency flag.
    async fn store_currency_flag(
        &self,
        pool: &PgPool,
        symbol: &str,
        flag: CurrencyFlag,
    ) -> Result<()>;

    /// Translate a symbol key into this market's row key.
    ///
    /// Identity for ticker-keyed markets; the US adapter maps tickers to
    /// `stock_id`. `None` means the store does not know the symbol and the
    /// record must be skipped (with a warning at the call site).
    fn rekey(&self, key: &SymbolKey) -> Option<SymbolKey>;
}

/// Probe whether the target table exists (precondition check; failing it is
/// fatal before any fetch work starts).
pub async fn table_exists(pool: &PgPool, table: &str) -> bool {
    sqlx::query(&format!("SELECT 1 FROM {} LIMIT 1", table))
        .fetch_optional(pool)
        .await
        .is_ok()
}

/// Rekey a record batch for the adapter's market.
///
/// Records the store has no id for are skipped with a warning; they are
/// profile-roster gaps, not data errors.
pub fn rekey_records<R: UpsertRow>(adapter: &dyn MarketAdapter, records: Vec<R>) -> Vec<R> {
    records
        .into_iter()
        .filter_map(|mut record| match adapter.rekey(record.key()) {
            Some(key) => {
                record.set_key(key);
                Some(record)
            }
            None => {
                tracing::warn!(key = %record.key(), "no store id for symbol, skipping record");
                None
            }
        })
        .collect()
}
