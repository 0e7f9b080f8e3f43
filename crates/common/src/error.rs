use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed candle row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Column contract violated: {0}")]
    ColumnContract(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Broker error: {0}")]
    Collaborator(String),

    #[error("Order dispatch failed: {0}")]
    Dispatch(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRow {
            row,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
