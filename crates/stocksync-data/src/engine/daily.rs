//! Daily price history with incremental windows.
//!
//! # Incremental resolution
//!
//! - New symbol (no stored state): fetch a full lookback window
//!   (`backfill_days`, configured; see the collector config).
//! - Known symbol: fetch from the last stored date *inclusive*. Re-fetching
//!   the boundary date is how late corrections (revised closes, split
//!   adjustments) propagate: after normalization the boundary row is
//!   compared field-by-field against the stored state and dropped only when
//!   nothing changed.
//! - Empty upstream window (e.g. a pre-IPO ticker) yields zero records and
//!   no error.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::engine::backfill::{apply_market_cap, RawDailyRow};
use crate::engine::{collect_per_symbol, PerSymbolOutcome};
use crate::error::Result;
use crate::provider::{McapScraper, QuoteSummaryClient, YahooChartClient};
use stocksync_core::{cast_int, DailyRecord, LastDailyState, SymbolKey};

/// Build daily records for a symbol batch.
///
/// `last_states` holds the most recent stored row per symbol; symbols
/// absent from the map are treated as new and backfilled over
/// `backfill_days`.
pub async fn build_daily_records(
    chart: &YahooChartClient,
    summary: &QuoteSummaryClient,
    scraper: &McapScraper,
    symbols: &[String],
    last_states: &HashMap<String, LastDailyState>,
    backfill_days: i64,
) -> PerSymbolOutcome<DailyRecord> {
    let updated_on = Utc::now();

    collect_per_symbol(symbols, "daily_data", |symbol| {
        let last = last_states.get(&symbol);
        async move {
            fetch_symbol_daily(
                chart,
                summary,
                scraper,
                symbol,
                last,
                backfill_days,
                updated_on,
            )
            .await
        }
    })
    .await
}

/// Fetch, repair and incrementally filter one symbol's daily window.
async fn fetch_symbol_daily(
    chart: &YahooChartClient,
    summary: &QuoteSummaryClient,
    scraper: &McapScraper,
    symbol: String,
    last: Option<&LastDailyState>,
    backfill_days: i64,
    updated_on: DateTime<Utc>,
) -> Result<Vec<DailyRecord>> {
    let today = Utc::now().date_naive();
    let end = today + Duration::days(1);

    let start = match last {
        Some(state) => state.date,
        None => today - Duration::days(backfill_days),
    };

    let bars = chart.daily_history(&symbol, start, end).await?;
    if bars.is_empty() {
        debug!(symbol = %symbol, "no bars in window");
        return Ok(Vec::new());
    }

    let mut rows: Vec<RawDailyRow> = bars
        .iter()
        .map(|bar| RawDailyRow {
            date: bar.date,
            close: Some(bar.close),
            volume: Some(bar.volume),
            market_cap: None,
            mcap_method: None,
        })
        .collect();

    // Seed the boundary date with its stored cap so the backfill does not
    // re-derive a value that is already known.
    if let Some(state) = last {
        if let Some(row) = rows.iter_mut().find(|r| r.date == state.date) {
            row.market_cap = state.market_cap.map(|v| v as f64);
            row.mcap_method = state.mcap_method;
        }
    }

    // Tier (a): API-reported market cap. A failing info call fails the
    // symbol (queued for the retry pass); a failing scrape does not.
    let fresh_mcap = match summary.company_info(&symbol).await?.market_cap {
        Some(mcap) => Some(mcap),
        None => match scraper.fetch_market_cap(&symbol).await {
            Ok(mcap) => Some(mcap),
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "market cap fallback failed");
                None
            }
        },
    };

    let stored_multiplier = last.and_then(|state| match (state.market_cap, state.close) {
        (Some(mcap), Some(close)) if close != 0 => Some(mcap as f64 / close as f64),
        _ => None,
    });

    apply_market_cap(&mut rows, fresh_mcap, stored_multiplier);

    let mut records: Vec<DailyRecord> = rows
        .into_iter()
        .map(|row| DailyRecord {
            key: SymbolKey::Symbol(symbol.clone()),
            date: row.date,
            close: cast_int(row.close),
            volume: cast_int(row.volume),
            market_cap: cast_int(row.market_cap),
            mcap_method: row.mcap_method,
            updated_on,
        })
        .collect();

    if let Some(state) = last {
        drop_unchanged_boundary(&mut records, state);
    }

    Ok(records)
}

/// Remove the re-fetched boundary-date row when every compared field
/// (close, volume, market cap) still matches the stored state.
///
/// A differing row is kept: that is how corrections and split adjustments
/// reach the store.
fn drop_unchanged_boundary(records: &mut Vec<DailyRecord>, state: &LastDailyState) {
    if let Some(pos) = records.iter().position(|r| r.date == state.date) {
        if records[pos].matches_state(state) {
            records.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stocksync_core::McapMethod;

    fn record(date: NaiveDate, close: i64, volume: i64, mcap: Option<i64>) -> DailyRecord {
        DailyRecord {
            key: SymbolKey::Symbol("BBCA.JK".to_string()),
            date,
            close: Some(close),
            volume: Some(volume),
            market_cap: mcap,
            mcap_method: mcap.map(|_| McapMethod::Reported),
            updated_on: Utc::now(),
        }
    }

    #[test]
    fn test_unchanged_boundary_row_is_dropped() {
        let boundary = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let state = LastDailyState {
            date: boundary,
            close: Some(100),
            volume: Some(500),
            market_cap: Some(50_000),
            mcap_method: Some(McapMethod::Reported),
        };

        let mut records = vec![
            record(boundary, 100, 500, Some(50_000)),
            record(boundary + Duration::days(1), 102, 600, Some(51_000)),
        ];
        drop_unchanged_boundary(&mut records, &state);

        assert_eq!(records.len(), 1);
        assert!(records[0].date > boundary);
    }

    #[test]
    fn test_corrected_boundary_row_is_kept() {
        let boundary = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let state = LastDailyState {
            date: boundary,
            close: Some(100),
            volume: Some(500),
            market_cap: Some(50_000),
            mcap_method: Some(McapMethod::Reported),
        };

        // split-adjusted close
        let mut records = vec![record(boundary, 50, 500, Some(50_000))];
        drop_unchanged_boundary(&mut records, &state);

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_boundary_comparison_tolerates_null_mcap() {
        let boundary = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let state = LastDailyState {
            date: boundary,
            close: Some(100),
            volume: Some(500),
            market_cap: None,
            mcap_method: None,
        };

        let mut records = vec![DailyRecord {
            market_cap: None,
            mcap_method: None,
            ..record(boundary, 100, 500, None)
        }];
        drop_unchanged_boundary(&mut records, &state);

        assert!(records.is_empty());
    }
}
