use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures that abort a chargeback run.
///
/// Soft conditions (a sample whose resource was deleted, a rate detail naming
/// an unknown metric, a computed column the report does not declare) never
/// surface here; they are logged or dropped by the engine.
#[derive(Debug, Error)]
pub enum ChargebackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("interval '{0}' is not supported")]
    UnsupportedInterval(String),

    #[error(
        "expected 'hourly' performance interval but got '{interval}' (resource: {resource}, timestamp: {timestamp})"
    )]
    UnsupportedGranularity {
        interval: String,
        resource: String,
        timestamp: DateTime<Utc>,
    },

    #[error("local time {0} does not exist in the report timezone")]
    InvalidLocalTime(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Helper for mapping any unknown configuration problem into a config error
pub fn config_error<E: ToString>(err: E) -> ChargebackError {
    ChargebackError::Config(err.to_string())
}

pub type ChargebackResult<T> = Result<T, ChargebackError>;
