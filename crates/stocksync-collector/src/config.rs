//! Environment-variable based configuration.

use crate::Result;
use std::time::Duration;

/// Collector configuration.
#[derive(Debug, Clone)]
pub struct SyncerConfig {
    /// Database URL
    pub database_url: String,
    /// Lookback window in days for symbols without stored daily history.
    ///
    /// Deployments have run both a 400-day and a five-year window; neither
    /// is hardcoded, this value decides.
    pub backfill_days: i64,
    /// Commit settings
    pub commit: CommitConfig,
    /// Outbound request rate ceiling
    pub rate_limit: RateLimitConfig,
}

/// Batch commit settings.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    /// Records per upsert batch
    pub batch_size: usize,
    /// Attempts per batch before the failure becomes fatal
    pub max_retries: u32,
    /// Delay between attempts (seconds)
    pub backoff_secs: u64,
}

/// Outbound request rate ceiling, shared across all provider calls.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: usize,
    /// Window length (seconds)
    pub window_secs: u64,
}

impl SyncerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::SyncerError::Config("DATABASE_URL is not set".to_string())
        })?;

        Ok(Self {
            database_url,
            backfill_days: env_var_parse("SYNC_BACKFILL_DAYS", 1825),
            commit: CommitConfig {
                batch_size: env_var_parse("SYNC_COMMIT_BATCH_SIZE", 25),
                max_retries: env_var_parse("SYNC_COMMIT_MAX_RETRIES", 3),
                backoff_secs: env_var_parse("SYNC_COMMIT_BACKOFF_SECS", 3),
            },
            rate_limit: RateLimitConfig {
                max_requests: env_var_parse("SYNC_RATE_LIMIT_REQUESTS", 2),
                window_secs: env_var_parse("SYNC_RATE_LIMIT_WINDOW_SECS", 5),
            },
        })
    }
}

impl CommitConfig {
    /// Delay between attempts as a Duration.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

impl RateLimitConfig {
    /// Window length as a Duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Parse an environment variable, falling back to a default.
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parse_default() {
        assert_eq!(env_var_parse("SYNC_TEST_UNSET_VAR", 1825i64), 1825);
    }
}
