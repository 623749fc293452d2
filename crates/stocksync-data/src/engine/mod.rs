//! Incremental sync engine.
//!
//! Turns the provider's nested per-symbol responses into flat relational
//! records ready for upsert:
//!
//! - `daily` - price history with incremental windows and boundary-date
//!   reconciliation
//! - `backfill` - market-capitalization repair across confidence tiers
//! - `dividend` - dividend events with trailing-year yield
//! - `financials` - statement normalization, metric mapping, format-flag
//!   suppression
//! - `key_stats` - per-symbol statistics and holder breakdowns
//! - `currency` - reporting-currency classification and conversion
//!
//! # Failure isolation
//!
//! Everything here works symbol-at-a-time: one symbol's fetch failure never
//! drops another symbol's data. Failed symbols get one retry pass as a
//! group; symbols still failing are returned as `unadded` and surfaced to
//! the caller.

pub mod backfill;
pub mod currency;
pub mod daily;
pub mod dividend;
pub mod financials;
pub mod key_stats;

use std::future::Future;
use tracing::warn;

use crate::error::Result;

/// Records produced for a symbol batch, plus the symbols that failed both
/// passes.
#[derive(Debug)]
pub struct PerSymbolOutcome<R> {
    pub records: Vec<R>,
    pub unadded: Vec<String>,
}

/// Run a per-symbol fetch over a batch with failure isolation.
///
/// First pass collects failures instead of aborting; failed symbols are
/// retried once as a group, and symbols failing the retry land in
/// `unadded`.
pub(crate) async fn collect_per_symbol<R, F, Fut>(
    symbols: &[String],
    attribute: &str,
    mut fetch: F,
) -> PerSymbolOutcome<R>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<R>>>,
{
    let mut records = Vec::new();
    let mut retry_symbols = Vec::new();

    for symbol in symbols {
        match fetch(symbol.clone()).await {
            Ok(rows) => records.extend(rows),
            Err(e) => {
                warn!(symbol = %symbol, attribute, error = %e, "fetch failed, queued for retry");
                retry_symbols.push(symbol.clone());
            }
        }
    }

    let mut unadded = Vec::new();
    for symbol in retry_symbols {
        match fetch(symbol.clone()).await {
            Ok(rows) => records.extend(rows),
            Err(e) => {
                warn!(symbol = %symbol, attribute, error = %e, "retry failed, recording as unadded");
                unadded.push(symbol);
            }
        }
    }

    PerSymbolOutcome { records, unadded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_one_failing_symbol_does_not_drop_others() {
        let symbols = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];

        let outcome = collect_per_symbol(&symbols, "daily", |symbol| async move {
            if symbol == "BBB" {
                Err(DataError::FetchError("boom".to_string()))
            } else {
                Ok(vec![symbol])
            }
        })
        .await;

        assert_eq!(outcome.records, vec!["AAA".to_string(), "CCC".to_string()]);
        assert_eq!(outcome.unadded, vec!["BBB".to_string()]);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_on_retry_pass() {
        let symbols = vec!["AAA".to_string()];
        let mut attempts: HashMap<String, u32> = HashMap::new();

        let outcome = collect_per_symbol(&symbols, "daily", |symbol| {
            let n = attempts.entry(symbol.clone()).or_insert(0);
            *n += 1;
            let attempt = *n;
            async move {
                if attempt == 1 {
                    Err(DataError::FetchError("transient".to_string()))
                } else {
                    Ok(vec![symbol])
                }
            }
        })
        .await;

        assert_eq!(outcome.records, vec!["AAA".to_string()]);
        assert!(outcome.unadded.is_empty());
    }
}
