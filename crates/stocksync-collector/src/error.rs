//! Error type definitions.

use std::fmt;

use stocksync_data::DataError;

/// Collector error type.
#[derive(Debug)]
pub enum SyncerError {
    /// Database error
    Database(sqlx::Error),
    /// Configuration / precondition error
    Config(String),
    /// Data layer error (provider, engine, store)
    Data(DataError),
    /// Generic error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for SyncerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for SyncerError {}

impl From<sqlx::Error> for SyncerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<DataError> for SyncerError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<std::env::VarError> for SyncerError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for SyncerError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SyncerError>;
