//! Error types for the persistence and configuration layers.
//!
//! HTTP handlers wrap these in [`crate::AppError`]; the realtime path turns
//! them into a denial instead.

use thiserror::Error;

/// Failure talking to the token or account tables.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Query or transaction failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Expiry could not be represented as a timestamp.
    #[error("token expiry out of range")]
    Clock,
}

/// Failure loading `config.toml` or its environment overrides.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
