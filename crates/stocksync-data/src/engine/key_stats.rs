//! Per-symbol key statistics.
//!
//! One row per symbol, upserted wholesale: forward EPS, recommendation
//! mean, employee count and the major-holders breakdown. A missing holders
//! module degrades to NULL instead of failing the symbol.

use chrono::Utc;

use crate::engine::{collect_per_symbol, PerSymbolOutcome};
use crate::provider::QuoteSummaryClient;
use stocksync_core::{cast_int, KeyStatsRecord, SymbolKey};
use tracing::debug;

/// Build key-stats records for a symbol batch.
pub async fn build_key_stats_records(
    summary: &QuoteSummaryClient,
    symbols: &[String],
) -> PerSymbolOutcome<KeyStatsRecord> {
    let updated_on = Utc::now();

    collect_per_symbol(symbols, "key_stats", |symbol| async move {
        let info = summary.company_info(&symbol).await?;

        let holders_breakdown = match summary.holders_breakdown(&symbol).await {
            Ok(breakdown) => breakdown,
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "holders breakdown unavailable");
                None
            }
        };

        Ok(vec![KeyStatsRecord {
            key: SymbolKey::Symbol(symbol),
            forward_eps: info.forward_eps,
            recommendation_mean: info.recommendation_mean,
            employee_num: cast_int(info.employee_num),
            holders_breakdown,
            updated_on,
        }])
    })
    .await
}
