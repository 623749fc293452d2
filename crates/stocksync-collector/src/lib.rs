//! Standalone data sync binary for the stock data platform.
//!
//! This crate provides the thin layer around the sync engine:
//! - CLI argument parsing and env-based configuration
//! - the per-category run orchestrator
//! - run statistics

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::SyncerConfig;
pub use error::{Result, SyncerError};
pub use stats::SyncStats;
