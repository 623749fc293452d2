//! Quote-summary JSON client.
//!
//! Fetches the provider's nested per-symbol summary document over plain
//! HTTP and exposes the pieces the sync pipeline consumes:
//!
//! - company info (market cap, reporting currency, key statistics)
//! - major holders breakdown
//! - financial statements (income, balance sheet, cash flow; annual and
//!   quarterly)
//!
//! Responses are kept as raw field maps here; deciding which provider
//! fields survive (and under which canonical names) is the normalizer's
//! job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::limiter::RateLimiter;
use stocksync_core::StatementPeriod;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Company-level summary fields consumed by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Intraday market capitalization, as reported.
    pub market_cap: Option<f64>,
    /// Financial reporting currency code (e.g. "IDR", "USD").
    pub financial_currency: Option<String>,
    pub forward_eps: Option<f64>,
    pub recommendation_mean: Option<f64>,
    pub employee_num: Option<f64>,
}

/// One raw statement: date plus every numeric field the provider returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStatement {
    pub date: NaiveDate,
    pub fields: HashMap<String, f64>,
}

/// Raw statements for one symbol, one period type.
#[derive(Debug, Clone, Default)]
pub struct RawStatements {
    pub income: Vec<RawStatement>,
    pub balance: Vec<RawStatement>,
    pub cash_flow: Vec<RawStatement>,
}

/// Quote-summary endpoint client with shared rate limiting.
pub struct QuoteSummaryClient {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    base_url: String,
}

impl QuoteSummaryClient {
    /// Create a client sharing the given request limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            limiter,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Company info for the daily, key-stats and currency pipelines.
    pub async fn company_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let result = self
            .fetch_modules(
                symbol,
                "price,defaultKeyStatistics,financialData,assetProfile",
            )
            .await?;

        Ok(CompanyInfo {
            market_cap: raw_num(&result, "price", "marketCap"),
            financial_currency: result
                .get("financialData")
                .and_then(|m| m.get("financialCurrency"))
                .and_then(Value::as_str)
                .map(str::to_string),
            forward_eps: raw_num(&result, "defaultKeyStatistics", "forwardEps"),
            recommendation_mean: raw_num(&result, "financialData", "recommendationMean"),
            employee_num: result
                .get("assetProfile")
                .and_then(|m| m.get("fullTimeEmployees"))
                .and_then(Value::as_f64),
        })
    }

    /// Major holders breakdown as a label -> value map, or `None` when the
    /// provider has no holder data for the symbol.
    pub async fn holders_breakdown(&self, symbol: &str) -> Result<Option<Value>> {
        let result = self.fetch_modules(symbol, "majorHoldersBreakdown").await?;

        let module = match result.get("majorHoldersBreakdown") {
            Some(m) if m.is_object() => m,
            _ => return Ok(None),
        };

        let mut breakdown = serde_json::Map::new();
        for (provider_field, label) in [
            ("insidersPercentHeld", "insiders_percent_held"),
            ("institutionsPercentHeld", "institutions_percent_held"),
            (
                "institutionsFloatPercentHeld",
                "institutions_float_percent_held",
            ),
            ("institutionsCount", "institutions_count"),
        ] {
            let value = module
                .get(provider_field)
                .map(|v| unwrap_raw(v))
                .unwrap_or(Value::Null);
            breakdown.insert(label.to_string(), value);
        }

        Ok(Some(Value::Object(breakdown)))
    }

    /// Financial statements for one symbol and period type.
    pub async fn financial_statements(
        &self,
        symbol: &str,
        period: StatementPeriod,
    ) -> Result<RawStatements> {
        let (income_module, balance_module, cashflow_module) = match period {
            StatementPeriod::Annual => (
                "incomeStatementHistory",
                "balanceSheetHistory",
                "cashflowStatementHistory",
            ),
            StatementPeriod::Quarterly => (
                "incomeStatementHistoryQuarterly",
                "balanceSheetHistoryQuarterly",
                "cashflowStatementHistoryQuarterly",
            ),
        };

        let modules = format!(
            "{},{},{}",
            income_module, balance_module, cashflow_module
        );
        let result = self.fetch_modules(symbol, &modules).await?;

        Ok(RawStatements {
            income: parse_statement_list(&result, income_module, "incomeStatementHistory"),
            balance: parse_statement_list(&result, balance_module, "balanceSheetStatements"),
            cash_flow: parse_statement_list(&result, cashflow_module, "cashflowStatements"),
        })
    }

    /// Fetch the given summary modules and return `result[0]`.
    async fn fetch_modules(&self, symbol: &str, modules: &str) -> Result<Value> {
        self.limiter.acquire().await;

        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, symbol, modules
        );

        debug!(symbol = symbol, modules = modules, "quote summary request");

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::FetchError(format!(
                "provider rate limit hit for {}",
                symbol
            )));
        }
        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "quote summary HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let body: Value = response.json().await?;

        let summary = body
            .get("quoteSummary")
            .ok_or_else(|| DataError::ParseError("missing quoteSummary envelope".to_string()))?;

        if let Some(err) = summary.get("error").filter(|e| !e.is_null()) {
            return Err(DataError::FetchError(format!(
                "quote summary error for {}: {}",
                symbol, err
            )));
        }

        summary
            .get("result")
            .and_then(|r| r.get(0))
            .cloned()
            .ok_or_else(|| DataError::ParseError(format!("empty quote summary for {}", symbol)))
    }
}

/// Unwrap the provider's `{"raw": n, "fmt": "..."}` number wrapper.
fn unwrap_raw(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get("raw").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Numeric field from a module, tolerating the raw/fmt wrapper.
fn raw_num(result: &Value, module: &str, field: &str) -> Option<f64> {
    result
        .get(module)
        .and_then(|m| m.get(field))
        .map(unwrap_raw)
        .as_ref()
        .and_then(Value::as_f64)
}

/// Parse one statement-history module into dated raw field maps.
///
/// Statements missing a parseable `endDate` are skipped; every other field
/// that unwraps to a number is kept.
fn parse_statement_list(result: &Value, module: &str, list_key: &str) -> Vec<RawStatement> {
    let items = match result
        .get(module)
        .and_then(|m| m.get(list_key))
        .and_then(Value::as_array)
    {
        Some(items) => items,
        None => return Vec::new(),
    };

    let mut statements: Vec<RawStatement> = items
        .iter()
        .filter_map(|item| {
            let date = item
                .get("endDate")
                .and_then(|d| d.get("fmt"))
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;

            let fields: HashMap<String, f64> = item
                .as_object()?
                .iter()
                .filter(|(k, _)| *k != "endDate" && *k != "maxAge")
                .filter_map(|(k, v)| unwrap_raw(v).as_f64().map(|n| (k.clone(), n)))
                .collect();

            Some(RawStatement { date, fields })
        })
        .collect();

    statements.sort_by_key(|s| s.date);
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary_body(result: Value) -> Value {
        json!({ "quoteSummary": { "result": [result], "error": null } })
    }

    #[tokio::test]
    async fn test_company_info_parses_wrapped_numbers() {
        let mut server = mockito::Server::new_async().await;
        let body = summary_body(json!({
            "price": { "marketCap": { "raw": 1.23e12, "fmt": "1.23T" } },
            "defaultKeyStatistics": { "forwardEps": { "raw": 5.2 } },
            "financialData": {
                "recommendationMean": { "raw": 1.8 },
                "financialCurrency": "IDR"
            },
            "assetProfile": { "fullTimeEmployees": 25_000 }
        }));
        let _m = server
            .mock(
                "GET",
                mockito::Matcher::Regex("/v10/finance/quoteSummary/BBCA.JK.*".to_string()),
            )
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(1)));
        let client = QuoteSummaryClient::new(limiter)
            .unwrap()
            .with_base_url(server.url());

        let info = client.company_info("BBCA.JK").await.unwrap();
        assert_eq!(info.market_cap, Some(1.23e12));
        assert_eq!(info.financial_currency.as_deref(), Some("IDR"));
        assert_eq!(info.forward_eps, Some(5.2));
        assert_eq!(info.recommendation_mean, Some(1.8));
        assert_eq!(info.employee_num, Some(25_000.0));
    }

    #[tokio::test]
    async fn test_missing_fields_are_none_not_errors() {
        let mut server = mockito::Server::new_async().await;
        let body = summary_body(json!({ "price": {} }));
        let _m = server
            .mock(
                "GET",
                mockito::Matcher::Regex("/v10/finance/quoteSummary/.*".to_string()),
            )
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(1)));
        let client = QuoteSummaryClient::new(limiter)
            .unwrap()
            .with_base_url(server.url());

        let info = client.company_info("GOTO.JK").await.unwrap();
        assert_eq!(info, CompanyInfo::default());
    }

    #[test]
    fn test_parse_statement_list() {
        let result = json!({
            "incomeStatementHistory": {
                "incomeStatementHistory": [
                    {
                        "endDate": { "raw": 1703808000, "fmt": "2023-12-31" },
                        "totalRevenue": { "raw": 1_000_000.0, "fmt": "1M" },
                        "maxAge": 1,
                        "currencyCode": "USD"
                    },
                    {
                        // unparseable endDate -> skipped
                        "endDate": { "fmt": "not-a-date" },
                        "totalRevenue": { "raw": 5.0 }
                    }
                ]
            }
        });

        let parsed =
            parse_statement_list(&result, "incomeStatementHistory", "incomeStatementHistory");
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].date,
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        assert_eq!(parsed[0].fields.get("totalRevenue"), Some(&1_000_000.0));
        // non-numeric fields are dropped at the raw layer
        assert!(!parsed[0].fields.contains_key("currencyCode"));
    }
}
