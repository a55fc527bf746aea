use thiserror::Error;

/// Failures that keep the service from ever accepting traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },

    #[error("failed to create database: {0}")]
    CreateDatabase(#[source] sqlx::Error),

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to create schema: {0}")]
    CreateSchema(#[source] sqlx::Error),
}

/// A single insert or read that the datastore rejected or could not serve.
///
/// The message is the driver's, unchanged; it is returned to the caller
/// as-is.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct PersistenceError(#[from] pub sqlx::Error);
