//! Reporting-currency classification and conversion.
//!
//! Statement figures arrive in whatever currency the company reports in.
//! For the IDX platform the store expects rupiah, so USD-reporting symbols
//! are converted with the historical USD->IDR rate of each row's statement
//! date. Classification is resolved lazily per symbol (stored flag first,
//! provider info second), persisted through the adapter and cached for the
//! run. Rows whose currency cannot be determined are dropped and logged -
//! upserting them with wrong units would be silent corruption.

use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::Result;
use crate::provider::{FxRateClient, QuoteSummaryClient};
use crate::store::MarketAdapter;
use stocksync_core::{CurrencyFlag, FinancialRecord};

/// Resolve every symbol's reporting currency, persisting fresh discoveries.
///
/// Resolution order per symbol:
/// 1. flag already stored by a previous run
/// 2. the provider's `financialCurrency` (persisted via the adapter)
/// 3. `Unknown` when neither side knows (not persisted, retried next run)
pub async fn resolve_currency_flags(
    pool: &PgPool,
    adapter: &dyn MarketAdapter,
    summary: &QuoteSummaryClient,
    symbols: &[String],
) -> Result<HashMap<String, CurrencyFlag>> {
    let mut flags = HashMap::with_capacity(symbols.len());

    for symbol in symbols {
        if let Some(flag) = adapter.currency_flag(pool, symbol).await? {
            flags.insert(symbol.clone(), flag);
            continue;
        }

        let flag = match summary.company_info(symbol).await {
            Ok(info) => match info.financial_currency {
                Some(currency) => {
                    let flag = CurrencyFlag::from_provider(&currency);
                    adapter.store_currency_flag(pool, symbol, flag).await?;
                    info!(symbol = %symbol, currency = %flag, "reporting currency classified");
                    flag
                }
                None => CurrencyFlag::Unknown,
            },
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "currency classification fetch failed");
                CurrencyFlag::Unknown
            }
        };

        flags.insert(symbol.clone(), flag);
    }

    Ok(flags)
}

/// Convert financial rows into the base currency.
///
/// - base-currency rows pass through untouched (identity transform)
/// - USD rows have every monetary metric multiplied by the statement-date
///   rate and re-cast to integral
/// - rows with an unknown currency are dropped and logged
pub async fn convert_financials(
    records: Vec<FinancialRecord>,
    flags: &HashMap<String, CurrencyFlag>,
    fx: &FxRateClient,
    base: CurrencyFlag,
) -> Vec<FinancialRecord> {
    let mut converted = Vec::with_capacity(records.len());

    for mut record in records {
        let symbol = match record.key.symbol() {
            Some(symbol) => symbol.to_string(),
            None => {
                // conversion runs before rekeying; a rekeyed record here is
                // a pipeline ordering bug
                warn!(key = %record.key, "record already rekeyed, dropping from conversion");
                continue;
            }
        };

        let flag = flags.get(&symbol).copied().unwrap_or(CurrencyFlag::Unknown);

        if flag == base {
            converted.push(record);
            continue;
        }

        match flag {
            CurrencyFlag::Usd => {
                let rate = match fx.rate("USD", base.to_string().as_str(), record.date).await {
                    Ok(rate) => rate,
                    Err(e) => {
                        warn!(
                            symbol = %symbol,
                            date = %record.date,
                            error = %e,
                            "no exchange rate, dropping record"
                        );
                        continue;
                    }
                };

                for field in record.monetary_fields_mut() {
                    *field = field.map(|v| (v as f64 * rate).round() as i64);
                }
                converted.push(record);
            }
            _ => {
                warn!(
                    symbol = %symbol,
                    currency = %flag,
                    "unknown reporting currency, dropping record"
                );
            }
        }
    }

    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use stocksync_core::SymbolKey;

    fn usd_record(symbol: &str, revenue: i64) -> FinancialRecord {
        let mut record = FinancialRecord::empty(
            SymbolKey::Symbol(symbol.to_string()),
            NaiveDate::from_ymd_opt(2023, 12, 29).unwrap(),
            Utc::now(),
        );
        record.total_revenue = Some(revenue);
        record
    }

    #[tokio::test]
    async fn test_base_currency_is_identity() {
        let records = vec![usd_record("BBCA.JK", 1_000_000)];
        let flags = HashMap::from([("BBCA.JK".to_string(), CurrencyFlag::Idr)]);
        let fx = FxRateClient::new().unwrap().with_base_url("http://invalid");

        let converted = convert_financials(records.clone(), &flags, &fx, CurrencyFlag::Idr).await;
        assert_eq!(converted, records);
    }

    #[tokio::test]
    async fn test_usd_rows_convert_at_statement_date_rate() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/2023-12-29?from=USD&to=IDR")
            .with_status(200)
            .with_body(r#"{"rates":{"IDR":15000.0}}"#)
            .create_async()
            .await;

        let records = vec![usd_record("MDKA.JK", 1_000_000)];
        let flags = HashMap::from([("MDKA.JK".to_string(), CurrencyFlag::Usd)]);
        let fx = FxRateClient::new().unwrap().with_base_url(server.url());

        let converted = convert_financials(records, &flags, &fx, CurrencyFlag::Idr).await;
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].total_revenue, Some(15_000_000_000));
        // share counts are not monetary; untouched
        assert_eq!(converted[0].diluted_shares_outstanding, None);
    }

    #[tokio::test]
    async fn test_unknown_currency_rows_are_dropped() {
        let records = vec![
            usd_record("AAAA.JK", 1),
            usd_record("BBBB.JK", 2),
        ];
        let flags = HashMap::from([
            ("AAAA.JK".to_string(), CurrencyFlag::Unknown),
            ("BBBB.JK".to_string(), CurrencyFlag::Idr),
        ]);
        let fx = FxRateClient::new().unwrap().with_base_url("http://invalid");

        let converted = convert_financials(records, &flags, &fx, CurrencyFlag::Idr).await;
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].key.symbol(), Some("BBBB.JK"));
    }

    #[tokio::test]
    async fn test_unclassified_symbol_rows_are_dropped() {
        let records = vec![usd_record("CCCC.JK", 1)];
        let flags = HashMap::new();
        let fx = FxRateClient::new().unwrap().with_base_url("http://invalid");

        let converted = convert_financials(records, &flags, &fx, CurrencyFlag::Idr).await;
        assert!(converted.is_empty());
    }
}
