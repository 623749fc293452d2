//! Bounded-retry batch upsert committer.
//!
//! Records are partitioned into fixed-size batches preserving input order;
//! each batch becomes one multi-row `INSERT ... ON CONFLICT (key) DO
//! UPDATE` statement. A failing batch is retried with a fixed backoff;
//! exhausting the retries aborts the category (already-committed batches
//! stand - upserts are idempotent by conflict key, so a re-run is safe).

use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DataError, Result};
use crate::store::bind::UpsertRow;

/// Bounded retry with fixed backoff, shared by every commit call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

/// Batch upsert committer.
#[derive(Debug, Clone)]
pub struct BatchUpsertCommitter {
    batch_size: usize,
    retry: RetryPolicy,
}

impl Default for BatchUpsertCommitter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUpsertCommitter {
    pub fn new() -> Self {
        Self {
            batch_size: 25,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upsert `records` into `table`, conflicting on `conflict_cols`.
    ///
    /// Empty input is a no-op. Returns the number of records committed.
    pub async fn commit<R: UpsertRow>(
        &self,
        pool: &PgPool,
        table: &str,
        conflict_cols: &[&str],
        records: &[R],
    ) -> Result<usize> {
        if records.is_empty() {
            debug!(table = table, "no records to upsert");
            return Ok(0);
        }

        let columns = records[0].columns();
        let mut committed = 0;

        for chunk in records.chunks(self.batch_size) {
            let sql = build_upsert_sql(table, &columns, conflict_cols, chunk.len());
            self.execute_with_retry(pool, table, &sql, chunk).await?;
            committed += chunk.len();
        }

        info!(table = table, records = committed, "upsert complete");
        Ok(committed)
    }

    /// Run one batch statement under the retry policy.
    async fn execute_with_retry<R: UpsertRow>(
        &self,
        pool: &PgPool,
        table: &str,
        sql: &str,
        chunk: &[R],
    ) -> Result<()> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut query = sqlx::query(sql);
            for record in chunk {
                query = record.bind(query);
            }

            match query.execute(pool).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.retry.max_attempts => {
                    warn!(
                        table = table,
                        attempt = attempt,
                        error = %e,
                        "batch upsert failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => {
                    return Err(DataError::InsertError(format!(
                        "batch upsert to {} failed after {} attempts: {}",
                        table, attempt, e
                    )));
                }
            }
        }
    }
}

/// Build one multi-row upsert statement.
///
/// Non-key columns update from `EXCLUDED` on conflict, so replaying an
/// already-applied batch is a no-op write of identical values.
fn build_upsert_sql(table: &str, columns: &[&str], conflict_cols: &[&str], rows: usize) -> String {
    let col_list = columns.join(", ");

    let value_tuples: Vec<String> = (0..rows)
        .map(|row| {
            let placeholders: Vec<String> = (0..columns.len())
                .map(|col| format!("${}", row * columns.len() + col + 1))
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !conflict_cols.contains(*c))
        .map(|c| format!("{} = EXCLUDED.{}", c, c))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO UPDATE SET {}",
        table,
        col_list,
        value_tuples.join(", "),
        conflict_cols.join(", "),
        updates.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_shape() {
        let sql = build_upsert_sql(
            "idx_daily_data",
            &["symbol", "date", "close"],
            &["symbol", "date"],
            2,
        );
        assert_eq!(
            sql,
            "INSERT INTO idx_daily_data (symbol, date, close) \
             VALUES ($1, $2, $3), ($4, $5, $6) \
             ON CONFLICT (symbol, date) DO UPDATE SET close = EXCLUDED.close"
        );
    }

    #[test]
    fn test_conflict_columns_are_not_updated() {
        let sql = build_upsert_sql("key_stats", &["stock_id", "forward_eps"], &["stock_id"], 1);
        assert!(!sql.contains("stock_id = EXCLUDED"));
        assert!(sql.contains("forward_eps = EXCLUDED.forward_eps"));
    }

    #[test]
    fn test_batch_partitioning_is_ceil_of_n_over_size() {
        // commit() walks records.chunks(batch_size): 60 records at size 25
        // issue ceil(60/25) = 3 statements
        let records: Vec<u8> = vec![0; 60];
        assert_eq!(records.chunks(25).count(), 3);
        let records: Vec<u8> = vec![0; 50];
        assert_eq!(records.chunks(25).count(), 2);
        let records: Vec<u8> = vec![0; 1];
        assert_eq!(records.chunks(25).count(), 1);
    }
}
