// error.rs — Error types for the player store.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// A record file could not be serialized or parsed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The store was used after `close()`.
    #[error("store is closed")]
    Closed,

    /// A member id or bucket name that can't be used as a file name.
    #[error("invalid store key '{0}'")]
    InvalidKey(String),
}
