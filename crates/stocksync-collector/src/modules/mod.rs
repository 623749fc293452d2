//! Per-category sync modules and the run orchestrator.
//!
//! A run targets one table of one market:
//!
//! 1. precondition checks (table exists, page not empty) - fatal before
//!    any fetch work
//! 2. symbol paging (`batch_size = -1` means the whole roster)
//! 3. category pipeline: fetch -> normalize -> resolve incremental window
//!    -> repair -> (financials) currency-normalize -> rekey -> commit
//!
//! Symbols that failed both fetch passes are carried in the outcome -
//! they are never silently dropped.

pub mod daily;
pub mod dividend;
pub mod financials;
pub mod key_stats;

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::SyncerConfig;
use crate::error::{Result, SyncerError};
use crate::stats::SyncStats;
use stocksync_core::{Market, StatementPeriod};
use stocksync_data::limiter::RateLimiter;
use stocksync_data::provider::{FxRateClient, McapScraper, QuoteSummaryClient, YahooChartClient};
use stocksync_data::store::{
    table_exists, BatchUpsertCommitter, IdxAdapter, MarketAdapter, RetryPolicy, UsAdapter,
};

/// What a target table name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Daily,
    Dividend,
    KeyStats,
    Financials(StatementPeriod),
}

/// Resolve the pipeline category from the target table name.
pub fn resolve_category(table: &str) -> Result<Category> {
    if table.contains("daily_data") {
        Ok(Category::Daily)
    } else if table.contains("key_stats") {
        Ok(Category::KeyStats)
    } else if table.contains("dividend") {
        Ok(Category::Dividend)
    } else if table.contains("financials") {
        if table.contains("quarterly") {
            Ok(Category::Financials(StatementPeriod::Quarterly))
        } else if table.contains("annual") {
            Ok(Category::Financials(StatementPeriod::Annual))
        } else {
            Err(SyncerError::Config(format!(
                "financials table {} must name a period (quarterly/annual)",
                table
            )))
        }
    } else {
        Err(SyncerError::Config(format!(
            "unknown target table: {}",
            table
        )))
    }
}

/// Slice one page out of the symbol roster.
///
/// `batch_size = -1` selects everything; an empty page is fatal (there is
/// nothing to sync, which means the paging arguments are wrong).
pub fn page_symbols(symbols: Vec<String>, batch_size: i64, batch_num: i64) -> Result<Vec<String>> {
    let page = match batch_size {
        -1 => symbols,
        n if n > 0 => {
            let size = n as usize;
            let start = (batch_num.max(1) as usize - 1) * size;
            symbols.into_iter().skip(start).take(size).collect()
        }
        _ => {
            return Err(SyncerError::Config(format!(
                "invalid batch size: {}",
                batch_size
            )))
        }
    };

    if page.is_empty() {
        return Err(SyncerError::Config("no symbols to extract".to_string()));
    }

    Ok(page)
}

/// Tables `run-all` walks for a market, in order.
pub fn default_tables(market: Market) -> &'static [&'static str] {
    match market {
        Market::Idx => &[
            "idx_daily_data",
            "idx_dividend",
            "idx_key_stats",
            "idx_financials_quarterly",
            "idx_financials_annual",
        ],
        Market::Us => &["daily_data", "dividend", "key_stats"],
    }
}

/// Run one sync: resolve the category, page the symbols, execute the
/// category pipeline, commit.
pub async fn run(
    pool: &PgPool,
    config: &SyncerConfig,
    market: Market,
    target_table: &str,
    batch_size: i64,
    batch_num: i64,
) -> Result<SyncStats> {
    let start = Instant::now();

    let category = resolve_category(target_table)?;

    if !table_exists(pool, target_table).await {
        return Err(SyncerError::Config(format!(
            "table {} does not exist",
            target_table
        )));
    }

    let adapter: Box<dyn MarketAdapter> = match market {
        Market::Idx => Box::new(IdxAdapter::new()),
        Market::Us => Box::new(UsAdapter::new()),
    };

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    ));
    let chart = YahooChartClient::new(Arc::clone(&limiter))?;
    let summary = QuoteSummaryClient::new(Arc::clone(&limiter))?;
    let committer = BatchUpsertCommitter::new()
        .with_batch_size(config.commit.batch_size)
        .with_retry(RetryPolicy {
            max_attempts: config.commit.max_retries,
            backoff: config.commit.backoff(),
        });

    let roster = adapter.list_active_symbols(pool).await?;
    let symbols = page_symbols(roster, batch_size, batch_num)?;

    info!(
        market = %market,
        table = target_table,
        symbols = symbols.len(),
        batch_size = batch_size,
        batch_num = batch_num,
        "sync run starting"
    );

    let mut stats = match category {
        Category::Daily => {
            let scraper = McapScraper::new(Arc::clone(&limiter))?;
            daily::sync_daily(
                pool,
                adapter.as_ref(),
                &committer,
                &chart,
                &summary,
                &scraper,
                &symbols,
                target_table,
                config.backfill_days,
            )
            .await?
        }
        Category::Dividend => {
            dividend::sync_dividends(
                pool,
                adapter.as_ref(),
                &committer,
                &chart,
                &symbols,
                target_table,
            )
            .await?
        }
        Category::KeyStats => {
            key_stats::sync_key_stats(
                pool,
                adapter.as_ref(),
                &committer,
                &summary,
                &symbols,
                target_table,
            )
            .await?
        }
        Category::Financials(period) => {
            let fx = FxRateClient::new()?;
            financials::sync_financials(
                pool,
                adapter.as_ref(),
                &committer,
                &summary,
                &fx,
                &symbols,
                target_table,
                period,
            )
            .await?
        }
    };

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("SYM{:03}", i)).collect()
    }

    #[test]
    fn test_resolve_category_by_table_name() {
        assert_eq!(resolve_category("idx_daily_data").unwrap(), Category::Daily);
        assert_eq!(resolve_category("daily_data").unwrap(), Category::Daily);
        assert_eq!(
            resolve_category("idx_key_stats").unwrap(),
            Category::KeyStats
        );
        assert_eq!(resolve_category("dividend").unwrap(), Category::Dividend);
        assert_eq!(
            resolve_category("idx_financials_quarterly").unwrap(),
            Category::Financials(StatementPeriod::Quarterly)
        );
        assert_eq!(
            resolve_category("idx_financials_annual").unwrap(),
            Category::Financials(StatementPeriod::Annual)
        );
    }

    #[test]
    fn test_resolve_category_rejects_unknown_tables() {
        assert!(resolve_category("idx_financials").is_err());
        assert!(resolve_category("company_profile").is_err());
    }

    #[test]
    fn test_page_symbols_all() {
        let page = page_symbols(symbols(7), -1, 1).unwrap();
        assert_eq!(page.len(), 7);
    }

    #[test]
    fn test_page_symbols_slices() {
        let page = page_symbols(symbols(7), 3, 2).unwrap();
        assert_eq!(page, vec!["SYM003", "SYM004", "SYM005"]);

        let page = page_symbols(symbols(7), 3, 3).unwrap();
        assert_eq!(page, vec!["SYM006"]);
    }

    #[test]
    fn test_page_past_the_end_is_fatal() {
        assert!(page_symbols(symbols(7), 3, 4).is_err());
        assert!(page_symbols(Vec::new(), -1, 1).is_err());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(page_symbols(symbols(7), 0, 1).is_err());
    }
}
