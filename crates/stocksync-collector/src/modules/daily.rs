//! Daily price sync.

use sqlx::PgPool;
use tracing::info;

use crate::error::Result;
use crate::stats::SyncStats;
use stocksync_data::engine::daily::build_daily_records;
use stocksync_data::provider::{McapScraper, QuoteSummaryClient, YahooChartClient};
use stocksync_data::store::{rekey_records, BatchUpsertCommitter, MarketAdapter};

/// Sync the daily table: incremental windows per symbol, market-cap
/// repair, boundary reconciliation, batch commit.
#[allow(clippy::too_many_arguments)]
pub async fn sync_daily(
    pool: &PgPool,
    adapter: &dyn MarketAdapter,
    committer: &BatchUpsertCommitter,
    chart: &YahooChartClient,
    summary: &QuoteSummaryClient,
    scraper: &McapScraper,
    symbols: &[String],
    table: &str,
    backfill_days: i64,
) -> Result<SyncStats> {
    let last_states = adapter.last_daily_states(pool).await?;
    info!(
        known_symbols = last_states.len(),
        "last daily states loaded"
    );

    let outcome = build_daily_records(
        chart,
        summary,
        scraper,
        symbols,
        &last_states,
        backfill_days,
    )
    .await;

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
