//! Market-capitalization backfill.
//!
//! A freshly fetched daily window usually carries no market cap except what
//! the provider reports for "now". Reconciliation order for the most recent
//! date:
//!
//! 1. provider-reported market cap (API, then the key-statistics page
//!    fallback) -> `McapMethod::Reported`
//! 2. otherwise the row stays NULL
//!
//! Earlier rows lacking a market cap are backfilled with an implied
//! shares-outstanding multiplier: `fresh_market_cap / fresh_close`
//! (`DerivedFresh`) when a fresh cap exists, else
//! `last_market_cap / last_close` from the stored state (`DerivedStored`).
//! With no multiplier at all, the gaps stay NULL.

use chrono::NaiveDate;
use stocksync_core::McapMethod;

/// Daily row while still in float form, before integral casting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawDailyRow {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub mcap_method: Option<McapMethod>,
}

/// Set the latest row's market cap and backfill earlier gaps.
///
/// `rows` must be sorted ascending by date. The latest row is always
/// overwritten with the fresh value (or NULL), so a re-fetched boundary
/// date that happens to be the latest date picks up the current intraday
/// cap.
pub(crate) fn apply_market_cap(
    rows: &mut [RawDailyRow],
    fresh_mcap: Option<f64>,
    stored_multiplier: Option<f64>,
) {
    let Some(latest) = rows.last_mut() else {
        return;
    };

    latest.market_cap = fresh_mcap;
    latest.mcap_method = fresh_mcap.map(|_| McapMethod::Reported);

    let fresh_multiplier = match (fresh_mcap, latest.close) {
        (Some(mcap), Some(close)) if close != 0.0 && close.is_finite() => Some(mcap / close),
        _ => None,
    };

    let (multiplier, method) = match (fresh_multiplier, stored_multiplier) {
        (Some(m), _) => (m, McapMethod::DerivedFresh),
        (None, Some(m)) => (m, McapMethod::DerivedStored),
        (None, None) => return,
    };

    for row in rows.iter_mut() {
        if row.market_cap.is_none() {
            if let Some(close) = row.close {
                row.market_cap = Some(close * multiplier);
                row.mcap_method = Some(method);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, close: f64) -> RawDailyRow {
        RawDailyRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close: Some(close),
            volume: Some(1000.0),
            market_cap: None,
            mcap_method: None,
        }
    }

    #[test]
    fn test_fresh_mcap_reported_and_backfilled() {
        let mut rows = vec![row(1, 100.0), row(2, 110.0), row(3, 120.0)];
        apply_market_cap(&mut rows, Some(600_000.0), None);

        // latest: reported as-is
        assert_eq!(rows[2].market_cap, Some(600_000.0));
        assert_eq!(rows[2].mcap_method, Some(McapMethod::Reported));

        // earlier rows: close * (600_000 / 120) = close * 5000
        assert_eq!(rows[0].market_cap, Some(500_000.0));
        assert_eq!(rows[0].mcap_method, Some(McapMethod::DerivedFresh));
        assert_eq!(rows[1].market_cap, Some(550_000.0));
        assert_eq!(rows[1].mcap_method, Some(McapMethod::DerivedFresh));
    }

    #[test]
    fn test_stored_multiplier_used_when_no_fresh_cap() {
        let mut rows = vec![row(1, 100.0), row(2, 110.0)];
        apply_market_cap(&mut rows, None, Some(5000.0));

        // every row (latest included) is a gap; all filled from the stored
        // multiplier
        assert_eq!(rows[0].market_cap, Some(500_000.0));
        assert_eq!(rows[0].mcap_method, Some(McapMethod::DerivedStored));
        assert_eq!(rows[1].market_cap, Some(550_000.0));
        assert_eq!(rows[1].mcap_method, Some(McapMethod::DerivedStored));
    }

    #[test]
    fn test_no_multiplier_leaves_gaps_null() {
        let mut rows = vec![row(1, 100.0), row(2, 110.0)];
        apply_market_cap(&mut rows, None, None);

        assert_eq!(rows[0].market_cap, None);
        assert_eq!(rows[0].mcap_method, None);
        assert_eq!(rows[1].market_cap, None);
        assert_eq!(rows[1].mcap_method, None);
    }

    #[test]
    fn test_seeded_boundary_row_is_not_overwritten() {
        let mut rows = vec![row(1, 100.0), row(2, 110.0), row(3, 120.0)];
        // boundary date carries its stored cap and method
        rows[0].market_cap = Some(490_000.0);
        rows[0].mcap_method = Some(McapMethod::Reported);

        apply_market_cap(&mut rows, Some(600_000.0), None);

        assert_eq!(rows[0].market_cap, Some(490_000.0));
        assert_eq!(rows[0].mcap_method, Some(McapMethod::Reported));
        assert_eq!(rows[1].mcap_method, Some(McapMethod::DerivedFresh));
    }

    #[test]
    fn test_reported_row_never_ranked_below_one() {
        let mut rows = vec![row(1, 100.0), row(2, 120.0)];
        apply_market_cap(&mut rows, Some(600_000.0), Some(9_999.0));

        // a directly reported cap keeps rank 1 even when a stored
        // multiplier exists
        assert_eq!(rows[1].mcap_method, Some(McapMethod::Reported));
    }

    #[test]
    fn test_empty_window_is_noop() {
        let mut rows: Vec<RawDailyRow> = Vec::new();
        apply_market_cap(&mut rows, Some(1.0), Some(1.0));
        assert!(rows.is_empty());
    }
}
