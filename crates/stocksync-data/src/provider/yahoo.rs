//! Yahoo Finance chart API client.
//!
//! Daily price history and dividend events via the chart endpoint
//! (`yahoo_finance_api` connector). Non-adjusted close semantics: the raw
//! `close` series is used, never `adjclose`, so that stored history matches
//! the exchange print and corrections arrive as boundary-date diffs.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::limiter::RateLimiter;

/// One daily bar from the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// One dividend event from the chart endpoint, before yield computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendEventRaw {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Chart API client with shared rate limiting.
pub struct YahooChartClient {
    connector: yahoo_finance_api::YahooConnector,
    limiter: Arc<RateLimiter>,
}

impl YahooChartClient {
    /// Create a client sharing the given request limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance connector: {}", e)))?;
        Ok(Self { connector, limiter })
    }

    /// Daily bars for `[start, end)`, ascending by date.
    ///
    /// An empty window (unknown or pre-IPO ticker with no prints yet) is an
    /// empty vector, not an error.
    pub async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChartBar>> {
        self.limiter.acquire().await;

        debug!(symbol = symbol, start = %start, end = %end, "chart history request");

        let response = self
            .connector
            .get_quote_history_interval(
                symbol,
                naive_date_to_offset_datetime(start),
                naive_date_to_offset_datetime(end),
                "1d",
            )
            .await
            .map_err(|e| {
                DataError::FetchError(format!("Yahoo Finance API error ({}): {}", symbol, e))
            })?;

        let quotes = match response.quotes() {
            Ok(q) => q,
            // The chart endpoint reports an empty window as a missing data
            // error; treat it as zero bars.
            Err(yahoo_finance_api::YahooError::NoResult)
            | Err(yahoo_finance_api::YahooError::NoQuotes) => Vec::new(),
            Err(e) => return Err(DataError::ParseError(format!("quote parse error: {}", e))),
        };

        let mut bars: Vec<ChartBar> = quotes
            .iter()
            .filter_map(|q| {
                let ts = Utc.timestamp_opt(q.timestamp as i64, 0).single()?;
                Some(ChartBar {
                    date: ts.date_naive(),
                    close: q.close,
                    volume: q.volume as f64,
                })
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        // The endpoint occasionally appends an intraday print duplicating
        // the last session; keep the later bar per date.
        bars.dedup_by_key(|b| b.date);

        Ok(bars)
    }

    /// All dividend events the provider has for the symbol, ascending.
    ///
    /// Incremental filtering against the stored last event date happens in
    /// the engine, not here.
    pub async fn dividends(&self, symbol: &str) -> Result<Vec<DividendEventRaw>> {
        self.limiter.acquire().await;

        debug!(symbol = symbol, "dividend history request");

        let response = self
            .connector
            .get_quote_range(symbol, "1d", "10y")
            .await
            .map_err(|e| {
                DataError::FetchError(format!("Yahoo Finance API error ({}): {}", symbol, e))
            })?;

        let dividends = match response.dividends() {
            Ok(d) => d,
            Err(yahoo_finance_api::YahooError::NoResult)
            | Err(yahoo_finance_api::YahooError::NoQuotes) => Vec::new(),
            Err(e) => {
                return Err(DataError::ParseError(format!(
                    "dividend parse error: {}",
                    e
                )))
            }
        };

        let mut events: Vec<DividendEventRaw> = dividends
            .iter()
            .filter_map(|d| {
                let ts = Utc.timestamp_opt(d.date as i64, 0).single()?;
                Some(DividendEventRaw {
                    date: ts.date_naive(),
                    amount: d.amount,
                })
            })
            .collect();

        events.sort_by_key(|e| e.date);

        Ok(events)
    }
}

/// Convert a NaiveDate to the connector's OffsetDateTime (UTC midnight).
fn naive_date_to_offset_datetime(date: NaiveDate) -> OffsetDateTime {
    let (year, month, day) = (date.year(), date.month() as u8, date.day() as u8);
    time::Date::from_calendar_date(year, time::Month::try_from(month).unwrap(), day)
        .unwrap()
        .midnight()
        .assume_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_date_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let odt = naive_date_to_offset_datetime(date);
        assert_eq!(odt.year(), 2024);
        assert_eq!(odt.month() as u8, 3);
        assert_eq!(odt.day(), 15);
        assert_eq!(odt.hour(), 0);
    }
}
