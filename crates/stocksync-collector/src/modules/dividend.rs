//! Dividend sync.

use sqlx::PgPool;
use tracing::info;

use crate::error::Result;
use crate::stats::SyncStats;
use stocksync_data::engine::dividend::build_dividend_records;
use stocksync_data::provider::YahooChartClient;
use stocksync_data::store::{rekey_records, BatchUpsertCommitter, MarketAdapter};

/// Sync the dividend table: events after each symbol's stored last date,
/// trailing-year yields, batch commit.
pub async fn sync_dividends(
    pool: &PgPool,
    adapter: &dyn MarketAdapter,
    committer: &BatchUpsertCommitter,
    chart: &YahooChartClient,
    symbols: &[String],
    table: &str,
) -> Result<SyncStats> {
    let last_dates = adapter.last_dates(pool, table).await?;
    info!(known_symbols = last_dates.len(), "last dividend dates loaded");

    let outcome = build_dividend_records(chart, symbols, &last_dates).await;

    let records = rekey_records(adapter, outcome.records);
    let conflict_cols = [adapter.key_column(), "date"];
    let upserted = committer
        .commit(pool, table, &conflict_cols, &records)
        .await?;

    Ok(SyncStats {
        symbols: symbols.len(),
        upserted,
        unadded: outcome.unadded,
        ..SyncStats::new()
    })
}
