// error.rs — Error types for the lifecycle layer.

use std::path::PathBuf;

use kb_record::ErrorRecord;
use thiserror::Error;

/// Errors that end or refuse a lifecycle run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A fatal startup step failed. The record names the step and cause;
    /// everything acquired before the failure has already been released.
    #[error("fatal startup error: {record}")]
    Fatal { record: ErrorRecord },

    /// Invalid lifecycle state transition.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The configuration file could not be read.
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl LifecycleError {
    /// The structured record of a fatal error, if this is one.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            LifecycleError::Fatal { record } => Some(record),
            _ => None,
        }
    }
}
