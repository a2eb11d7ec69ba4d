//! Error types for the signal pipeline.

use std::time::Duration;
use thiserror::Error;

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Data source errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for {0}")]
    NoDataAvailable(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

impl DataError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::ConnectionError(_)
                | DataError::Timeout(_)
                | DataError::RateLimited { .. }
                | DataError::Provider(_)
                | DataError::ParseError(_)
        )
    }
}

/// Indicator update errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Stale bar for {instrument}: timestamp {received} is not after {last}")]
    StaleBar {
        instrument: String,
        last: i64,
        received: i64,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Sink delivery errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Destination unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Rejected by destination: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SinkError {
    /// Whether a retry of the same write may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SinkError::Rejected(_) | SinkError::Serialization(_))
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}
