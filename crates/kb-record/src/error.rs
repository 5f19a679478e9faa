// error.rs — Error types for record output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while setting up or writing log output.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Failed to open or create the log file.
    #[error("failed to open log file at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The log filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    SubscriberInit(String),

    /// A record line could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A record line could not be written to the log file.
    #[error("failed to write record: {0}")]
    Write(#[from] std::io::Error),
}
