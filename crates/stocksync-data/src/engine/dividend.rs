//! Dividend events with trailing-year yield.
//!
//! Yield is `amount / mean close of the event's calendar year`. Events in
//! the current year get a NULL yield: the yearly mean is not complete, so a
//! computed value would be misleading. The per-(symbol, year) mean price is
//! fetched once and memoized for the run.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::engine::{collect_per_symbol, PerSymbolOutcome};
use crate::error::Result;
use crate::provider::YahooChartClient;
use stocksync_core::{DividendRecord, SymbolKey};

/// Build dividend records for a symbol batch.
///
/// `last_dates` holds the most recent stored event date per symbol; only
/// strictly later events are produced. Symbols without stored history
/// default to a five-calendar-year lookback (January 1st five years back).
pub async fn build_dividend_records(
    chart: &YahooChartClient,
    symbols: &[String],
    last_dates: &HashMap<String, NaiveDate>,
) -> PerSymbolOutcome<DividendRecord> {
    let updated_on = Utc::now();
    let today = updated_on.date_naive();
    let default_cutoff = NaiveDate::from_ymd_opt(today.year() - 5, 1, 1)
        .expect("January 1st is always a valid date");

    collect_per_symbol(symbols, "dividend", |symbol| {
        let cutoff = last_dates.get(&symbol).copied().unwrap_or(default_cutoff);
        async move { fetch_symbol_dividends(chart, symbol, cutoff, today, updated_on).await }
    })
    .await
}

/// Fetch one symbol's dividend events after `cutoff` and compute yields.
async fn fetch_symbol_dividends(
    chart: &YahooChartClient,
    symbol: String,
    cutoff: NaiveDate,
    today: NaiveDate,
    updated_on: DateTime<Utc>,
) -> Result<Vec<DividendRecord>> {
    let events = chart.dividends(&symbol).await?;

    let events: Vec<_> = events.into_iter().filter(|e| e.date > cutoff).collect();
    if events.is_empty() {
        debug!(symbol = %symbol, "no new dividend events");
        return Ok(Vec::new());
    }

    // year -> mean close, fetched at most once per year per symbol
    let mut mean_closes: HashMap<i32, Option<f64>> = HashMap::new();
    let mut records = Vec::with_capacity(events.len());

    for event in events {
        let year = event.date.year();

        // Only a completed year is worth a mean-price fetch.
        let mean = if year < today.year() {
            match mean_closes.get(&year) {
                Some(mean) => *mean,
                None => {
                    let mean = year_mean_close(chart, &symbol, year).await?;
                    mean_closes.insert(year, mean);
                    mean
                }
            }
        } else {
            None
        };

        let dividend_yield = trailing_yield(event.amount, year, today.year(), mean);

        records.push(DividendRecord {
            key: SymbolKey::Symbol(symbol.clone()),
            date: event.date,
            dividend: event.amount,
            dividend_yield,
            updated_on,
        });
    }

    Ok(records)
}

/// Yield for one event: `amount / mean close of the event's year`, NULL
/// for current-year events or when no mean price exists.
fn trailing_yield(
    amount: f64,
    event_year: i32,
    current_year: i32,
    mean_close: Option<f64>,
) -> Option<f64> {
    if event_year >= current_year {
        return None;
    }
    mean_close.filter(|m| *m != 0.0).map(|m| amount / m)
}

/// Mean close over one calendar year, `None` when the year has no bars.
async fn year_mean_close(
    chart: &YahooChartClient,
    symbol: &str,
    year: i32,
) -> Result<Option<f64>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year start");
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid year end");

    let bars = chart.daily_history(symbol, start, end).await?;
    if bars.is_empty() {
        return Ok(None);
    }

    let sum: f64 = bars.iter().map(|b| b.close).sum();
    Ok(Some(sum / bars.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_yield_for_completed_year() {
        let mean = Some(110.0);
        let dividend_yield = trailing_yield(50.0, 2023, 2024, mean).unwrap();
        assert!((dividend_yield - 50.0 / 110.0).abs() < 1e-12);
    }

    #[test]
    fn test_current_year_yield_is_null_even_with_mean() {
        assert_eq!(trailing_yield(50.0, 2024, 2024, Some(110.0)), None);
    }

    #[test]
    fn test_yield_null_without_usable_mean() {
        assert_eq!(trailing_yield(50.0, 2023, 2024, None), None);
        assert_eq!(trailing_yield(50.0, 2023, 2024, Some(0.0)), None);
    }
}
