//! Error types for the callback dispatcher

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Callback dispatcher error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Call-state database error: {0}")]
    CallState(#[from] sqlx::Error),

    #[error("Switch command failed: {0}")]
    Switch(String),

    #[error("Failed to launch switch command: {0}")]
    SwitchLaunch(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
