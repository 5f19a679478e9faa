// error.rs — Error types for platform operations.

use thiserror::Error;

/// Errors returned by a [`Platform`](crate::Platform) implementation.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("platform rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    /// An operation was attempted before `open()` or after `close()`.
    #[error("platform connection is not open")]
    NotOpen,

    /// The platform answered with a body we could not interpret.
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),

    /// The request was refused without reaching the platform.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl PlatformError {
    /// True when the platform answered 404: the member, role or command no
    /// longer exists, so retrying cannot succeed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::Api { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_api_404_is_not_found() {
        let gone = PlatformError::Api {
            status: 404,
            message: "Unknown Member".into(),
        };
        let forbidden = PlatformError::Api {
            status: 403,
            message: "Missing Permissions".into(),
        };
        assert!(gone.is_not_found());
        assert!(!forbidden.is_not_found());
        assert!(!PlatformError::Rejected("nope".into()).is_not_found());
    }
}
