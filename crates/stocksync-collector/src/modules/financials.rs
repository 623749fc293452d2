//! Financial statement sync.

use sqlx::PgPool;
use tracing::info;

use crate::error::{Result, SyncerError};
use crate::stats::SyncStats;
use stocksync_core::StatementPeriod;
use stocksync_data::engine::currency::{convert_financials, resolve_currency_flags};
use stocksync_data::engine::financials::build_financial_records;
use stocksync_data::provider::{FxRateClient, QuoteSummaryClient};
use stocksync_data::store::{rekey_records, BatchUpsertCommitter, MarketAdapter};

/// Sync a financials table: statements after each symbol's stored last
/// date, format-flag suppression, currency normalization, batch commit.
///
/// Only symbols the store already tracks for financials participate;
/// everything else waits for its initial load elsewhere.
#[allow(clippy::too_many_arguments)]
pub async fn sync_financials(
    pool: &PgPool,
    adapter: &dyn MarketAdapter,
    committer: &BatchUpsertCommitter,
    summary: &QuoteSummaryClient,
    fx: &FxRateClient,
    symbols: &[String],
    table: &str,
    period: StatementPeriod,
) -> Result<SyncStats> {
    if !adapter.supports_financials() {
        return Err(SyncerError::Config(format!(
            "financial statements are not available for the {} market",
            adapter.market()
        )));
    }

    let last_dates = adapter.financial_symbol_dates(pool, period).await?;

    let symbols: Vec<String> = symbols
        .iter()
        .filter(|s| last_dates.contains_key(*s))
        .cloned()
        .collect();

    info!(
        period = %period,
        tracked_symbols = symbols.len(),
        "financials symbols resolved"
    );

    let wsj_formats = adapter.wsj_formats(pool).await?;
    let flags = resolve_currency_flags(pool, adapter, summary, &symbols).await?;

    let outcome =
        build_financial_records(summary, &symbols, period, &last_dates, &wsj_formats).await;

    let converted =
        convert_financials(outcome.records, &flags, fx, adapter.market().base_flag()).await;

    let records = rekey_records(adapter, converted);
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
