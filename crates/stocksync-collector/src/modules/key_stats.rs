//! Key statistics sync.

use sqlx::PgPool;

use crate::error::Result;
use crate::stats::SyncStats;
use stocksync_data::engine::key_stats::build_key_stats_records;
use stocksync_data::provider::QuoteSummaryClient;
use stocksync_data::store::{rekey_records, BatchUpsertCommitter, MarketAdapter};

/// Sync the key-stats table: one wholesale row per symbol, no incremental
/// window.
pub async fn sync_key_stats(
    pool: &PgPool,
    adapter: &dyn MarketAdapter,
    committer: &BatchUpsertCommitter,
    summary: &QuoteSummaryClient,
    symbols: &[String],
    table: &str,
) -> Result<SyncStats> {
    let outcome = build_key_stats_records(summary, symbols).await;

    let records = rekey_records(adapter, outcome.records);
    let conflict_cols = [adapter.key_column()];
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
