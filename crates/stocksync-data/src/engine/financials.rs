//! Financial statement normalization.
//!
//! Three wide provider tables (income statement, balance sheet, cash flow)
//! become one flat row per `(symbol, date)`:
//!
//! 1. metric mapping: static provider-field -> canonical-column tables;
//!    unmapped provider fields are dropped, absent canonical columns become
//!    NULL
//! 2. outer join of the three statements on the statement date
//! 3. incremental filter: only dates strictly after the stored last
//!    statement date survive
//! 4. WSJ-format suppression: symbols whose statement format structurally
//!    lacks certain fields get those fields nulled regardless of what the
//!    provider returned
//! 5. integral casting and provenance stamping (`source = 1`)

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::engine::{collect_per_symbol, PerSymbolOutcome};
use crate::error::Result;
use crate::provider::{QuoteSummaryClient, RawStatement};
use stocksync_core::{cast_int, FinancialRecord, StatementPeriod, SymbolKey};

/// Income statement fields, provider name -> canonical column.
const INCOME_METRICS: &[(&str, &str)] = &[
    ("totalRevenue", "total_revenue"),
    ("grossProfit", "gross_income"),
    ("operatingIncome", "operating_income"),
    ("incomeBeforeTax", "pretax_income"),
    ("incomeTaxExpense", "income_taxes"),
    ("netIncome", "net_income"),
    ("ebit", "ebit"),
    ("ebitda", "ebitda"),
    ("dilutedAverageShares", "diluted_shares_outstanding"),
    (
        "interestExpenseNonOperating",
        "interest_expense_non_operating",
    ),
];

/// Balance sheet fields, provider name -> canonical column.
const BALANCE_METRICS: &[(&str, &str)] = &[
    (
        "cashCashEquivalentsAndShortTermInvestments",
        "cash_and_short_term_investments",
    ),
    ("totalAssets", "total_assets"),
    ("totalNonCurrentAssets", "total_non_current_assets"),
    ("totalLiabilitiesNetMinorityInterest", "total_liabilities"),
    ("currentLiabilities", "total_current_liabilities"),
    ("totalDebt", "total_debt"),
    ("stockholdersEquity", "stockholders_equity"),
    ("totalEquityGrossMinorityInterest", "total_equity"),
];

/// Cash flow fields, provider name -> canonical column. The direct-method
/// operating figure wins; the indirect one is its fallback.
const CASHFLOW_METRICS: &[(&str, &str)] = &[
    ("freeCashFlow", "free_cash_flow"),
    (
        "cashFlowsFromUsedInOperatingActivitiesDirect",
        "net_operating_cash_flow",
    ),
    ("operatingCashFlow", "net_operating_cash_flow_alt"),
];

/// One statement side after metric mapping: date -> canonical -> value.
type MappedStatements = BTreeMap<NaiveDate, HashMap<&'static str, Option<f64>>>;

/// Build financial records for a symbol batch.
///
/// Callers pass symbols already restricted to those the store tracks for
/// financials; `last_dates` bounds the incremental window (missing entries
/// fall back to an open window).
pub async fn build_financial_records(
    summary: &QuoteSummaryClient,
    symbols: &[String],
    period: StatementPeriod,
    last_dates: &HashMap<String, NaiveDate>,
    wsj_formats: &HashMap<String, i16>,
) -> PerSymbolOutcome<FinancialRecord> {
    let updated_on = Utc::now();
    let open_window = NaiveDate::from_ymd_opt(1900, 1, 1).expect("valid sentinel date");

    collect_per_symbol(symbols, "financials", |symbol| {
        let cutoff = last_dates.get(&symbol).copied().unwrap_or(open_window);
        let wsj_format = wsj_formats.get(&symbol).copied();
        async move {
            fetch_symbol_financials(summary, symbol, period, cutoff, wsj_format, updated_on).await
        }
    })
    .await
}

/// Fetch and normalize one symbol's statements.
async fn fetch_symbol_financials(
    summary: &QuoteSummaryClient,
    symbol: String,
    period: StatementPeriod,
    cutoff: NaiveDate,
    wsj_format: Option<i16>,
    updated_on: DateTime<Utc>,
) -> Result<Vec<FinancialRecord>> {
    let raw = summary.financial_statements(&symbol, period).await?;

    let income = map_metrics(&raw.income, INCOME_METRICS);
    let balance = map_metrics(&raw.balance, BALANCE_METRICS);
    let cash_flow = map_metrics(&raw.cash_flow, CASHFLOW_METRICS);

    let records = join_statements(
        &symbol, &income, &balance, &cash_flow, cutoff, wsj_format, updated_on,
    );

    Ok(records)
}

/// Apply a metric map to raw statements.
///
/// Every canonical column appears in every dated entry: present provider
/// fields carry their value, absent ones carry `None`. Provider fields
/// outside the map are dropped here.
fn map_metrics(statements: &[RawStatement], metrics: &[(&str, &'static str)]) -> MappedStatements {
    let mut mapped = MappedStatements::new();

    for statement in statements {
        let entry = mapped.entry(statement.date).or_default();
        for &(provider_field, canonical) in metrics {
            let value = statement.fields.get(provider_field).copied();
            entry.insert(canonical, value);
        }
    }

    mapped
}

/// Outer-join the three mapped statements and finish the rows.
fn join_statements(
    symbol: &str,
    income: &MappedStatements,
    balance: &MappedStatements,
    cash_flow: &MappedStatements,
    cutoff: NaiveDate,
    wsj_format: Option<i16>,
    updated_on: DateTime<Utc>,
) -> Vec<FinancialRecord> {
    let mut dates: Vec<NaiveDate> = income
        .keys()
        .chain(balance.keys())
        .chain(cash_flow.keys())
        .copied()
        .collect();
    dates.sort();
    dates.dedup();

    let mut records = Vec::new();

    for date in dates {
        if date <= cutoff {
            continue;
        }

        let mut record =
            FinancialRecord::empty(SymbolKey::Symbol(symbol.to_string()), date, updated_on);

        for mapped in [income, balance, cash_flow] {
            if let Some(row) = mapped.get(&date) {
                for (canonical, value) in row {
                    assign_metric(&mut record, canonical, *value);
                }
            }
        }

        // Direct-method operating cash flow missing: fall back to the
        // indirect figure captured under the alt key.
        if record.net_operating_cash_flow.is_none() {
            if let Some(row) = cash_flow.get(&date) {
                if let Some(alt) = row.get("net_operating_cash_flow_alt").copied().flatten() {
                    record.net_operating_cash_flow = cast_int(Some(alt));
                }
            }
        }

        apply_wsj_suppression(&mut record, wsj_format);

        records.push(record);
    }

    records
}

/// Route one canonical column into its record field, integral-cast.
fn assign_metric(record: &mut FinancialRecord, canonical: &str, value: Option<f64>) {
    let v = cast_int(value);
    match canonical {
        "total_revenue" => record.total_revenue = v,
        "gross_income" => record.gross_income = v,
        "operating_income" => record.operating_income = v,
        "pretax_income" => record.pretax_income = v,
        "income_taxes" => record.income_taxes = v,
        "net_income" => record.net_income = v,
        "ebit" => record.ebit = v,
        "ebitda" => record.ebitda = v,
        "diluted_shares_outstanding" => record.diluted_shares_outstanding = v,
        "interest_expense_non_operating" => record.interest_expense_non_operating = v,
        "cash_and_short_term_investments" => record.cash_and_short_term_investments = v,
        "total_assets" => record.total_assets = v,
        "total_non_current_assets" => record.total_non_current_assets = v,
        "total_liabilities" => record.total_liabilities = v,
        "total_current_liabilities" => record.total_current_liabilities = v,
        "total_debt" => record.total_debt = v,
        "stockholders_equity" => record.stockholders_equity = v,
        "total_equity" => record.total_equity = v,
        "free_cash_flow" => record.free_cash_flow = v,
        "net_operating_cash_flow" => record.net_operating_cash_flow = v,
        // alt keys and anything unmapped stop here
        _ => {}
    }
}

/// Null the fields a symbol's statement format structurally lacks.
///
/// Formats 3 and 4 lack gross income, EBITDA, cash & short-term
/// investments, non-current assets and current liabilities; format 4
/// additionally lacks EBIT and non-operating interest expense.
fn apply_wsj_suppression(record: &mut FinancialRecord, wsj_format: Option<i16>) {
    if matches!(wsj_format, Some(3) | Some(4)) {
        record.gross_income = None;
        record.ebitda = None;
        record.cash_and_short_term_investments = None;
        record.total_non_current_assets = None;
        record.total_current_liabilities = None;
    }
    if wsj_format == Some(4) {
        record.ebit = None;
        record.interest_expense_non_operating = None;
    }
}
