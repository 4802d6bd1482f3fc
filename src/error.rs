//! Error types for inbox-relay.

use std::path::PathBuf;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Mark-read error: {0}")]
    MarkRead(#[from] MarkReadError),

    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail session errors. Fatal at startup if no session can be built at all;
/// during steady state a failed auth logs and skips the cycle.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Cannot read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed token file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("Cannot persist refreshed token to {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Unread-listing errors. Recoverable: the cycle proceeds with zero items.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Mailbox request failed: {reason}")]
    Http { reason: String },

    #[error("Mailbox returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Mark-as-read errors. Logged only: the item stays unread upstream and is
/// skipped as already-processed on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum MarkReadError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Mark-read request for {id} failed: {reason}")]
    Http { id: String, reason: String },

    #[error("Mark-read for {id} returned {status}")]
    Status { id: String, status: u16 },
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The destination's periodic send limit is reached. Retrying within the
    /// same period cannot succeed, so delivery fails immediately.
    #[error("Messaging quota exhausted for this period")]
    QuotaExhausted,

    #[error("Send failed: {reason}")]
    Transient { reason: String },
}

impl NotifyError {
    /// Whether retrying this error within the current period can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::Transient { .. })
    }
}

/// Processed-log errors. Fatal for the affected item only: the item is not
/// recorded and is retried next cycle; the scheduler keeps running.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Cannot read processed log {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot append to processed log {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
