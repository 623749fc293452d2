//! Data module error types.

use thiserror::Error;

/// Data-layer errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// Query execution error
    #[error("Query error: {0}")]
    QueryError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Insert/upsert error
    #[error("Insert error: {0}")]
    InsertError(String),

    /// External data fetch error (provider, FX, scrape)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// Response parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid or malformed data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Configuration / precondition error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Connection pool exhausted
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::FetchError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
