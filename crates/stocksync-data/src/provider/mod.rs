//! External data provider clients.
//!
//! Every client holds a shared [`RateLimiter`](crate::limiter::RateLimiter)
//! and acquires a slot before each outbound request. Transport and parse
//! errors surface as `DataError` and are handled per symbol by the engine;
//! a failing symbol never aborts a batch.

pub mod fx;
pub mod mcap_scrape;
pub mod quote_summary;
pub mod yahoo;

pub use fx::FxRateClient;
pub use mcap_scrape::McapScraper;
pub use quote_summary::{CompanyInfo, QuoteSummaryClient, RawStatement, RawStatements};
pub use yahoo::{ChartBar, DividendEventRaw, YahooChartClient};
