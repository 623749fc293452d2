//! Sync run statistics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Symbols in the processed page
    pub symbols: usize,
    /// Records committed to the store
    pub upserted: usize,
    /// Symbols whose data could not be produced after retry
    pub unadded: Vec<String>,
    /// Wall time
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a one-line summary. The unadded list is always reported, even
    /// on success - silent data loss is a defect.
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            symbols = self.symbols,
            upserted = self.upserted,
            unadded = self.unadded.len(),
            unadded_symbols = ?self.unadded,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "sync complete"
        );
    }
}
