//! # StockSync Data
//!
//! Providers, incremental sync engine and store adapters for the stock
//! data platform:
//!
//! - `provider` - rate-limited clients for the external data source
//!   (chart history, quote summary, market-cap page fallback, FX rates)
//! - `engine` - normalization, incremental window resolution, market-cap
//!   backfill, currency conversion
//! - `store` - market adapters over the relational backend and the batch
//!   upsert committer
//! - `limiter` - the shared outbound token bucket

pub mod engine;
pub mod error;
pub mod limiter;
pub mod provider;
pub mod store;

pub use error::{DataError, Result};
pub use limiter::RateLimiter;
