//! Error types for the signal backtesting system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed for signal {signal_id}: {reason}")]
    Validation { signal_id: Uuid, reason: String },

    #[error("no price data available for instrument {0}")]
    DataUnavailable(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid signal data: {0}")]
    Parse(String),

    #[error("delivery error: {0}")]
    Delivery(String),
}

impl Error {
    /// Whether this error should abort the whole batch rather than skip
    /// the current signal. Only a broken persistent store qualifies.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Migration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
