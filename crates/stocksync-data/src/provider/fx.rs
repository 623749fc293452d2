//! Historical exchange rate client.
//!
//! ECB reference rates via the frankfurter.app API, one call per distinct
//! statement date, memoized in an in-run cache. Weekend and holiday dates
//! resolve to the most recent prior business day server-side, matching the
//! converter the platform used historically.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

/// Historical FX rate client with an in-run rate cache.
///
/// The cache is single-writer (the sequential pipeline) and lives only for
/// the duration of a run.
pub struct FxRateClient {
    client: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<(String, NaiveDate), f64>>,
}

impl FxRateClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Rate converting one unit of `from` into `to` on the given date.
    pub async fn rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<f64> {
        let key = (format!("{}_{}", from, to), date);

        if let Some(rate) = self.cache.lock().expect("fx cache poisoned").get(&key) {
            return Ok(*rate);
        }

        let url = format!(
            "{}/{}?from={}&to={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            from,
            to
        );

        debug!(from = from, to = to, date = %date, "fx rate request");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "fx rate HTTP {} for {} {}->{}",
                response.status(),
                date,
                from,
                to
            )));
        }

        let body: Value = response.json().await?;
        let rate = body
            .get("rates")
            .and_then(|r| r.get(to))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                DataError::ParseError(format!("no {} rate in fx response for {}", to, date))
            })?;

        self.cache
            .lock()
            .expect("fx cache poisoned")
            .insert(key, rate);

        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_is_fetched_then_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2023-12-29?from=USD&to=IDR")
            .with_status(200)
            .with_body(r#"{"base":"USD","date":"2023-12-29","rates":{"IDR":15416.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = FxRateClient::new().unwrap().with_base_url(server.url());
        let date = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();

        let first = client.rate("USD", "IDR", date).await.unwrap();
        let second = client.rate("USD", "IDR", date).await.unwrap();

        assert_eq!(first, 15416.0);
        assert_eq!(second, 15416.0);
        // second call must come from the cache
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_rate_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"rates":{}}"#)
            .create_async()
            .await;

        let client = FxRateClient::new().unwrap().with_base_url(server.url());
        let date = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();

        let err = client.rate("USD", "IDR", date).await.unwrap_err();
        assert!(matches!(err, DataError::ParseError(_)));
    }
}
