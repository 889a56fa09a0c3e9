//! Error types for the remote backend.

use crate::wire::ErrorBody;
use entilink_core::AccessError;
use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors raised while talking to a remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("HTTP error: {message}")]
    Http {
        /// Description of the failure.
        message: String,
        /// Whether repeating the request may succeed.
        retryable: bool,
    },

    /// The server answered with an error status.
    #[error("server returned {status}: {}", body.message)]
    Status {
        /// HTTP status code.
        status: u16,
        /// Decoded error body.
        body: ErrorBody,
    },

    /// A request or response body could not be (de)serialized.
    #[error("codec error: {0}")]
    Codec(String),

    /// The transport has been closed.
    #[error("transport is closed")]
    NotConnected,
}

impl RemoteError {
    /// Creates a retryable HTTP error.
    pub fn http_retryable(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable HTTP error.
    pub fn http_fatal(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<RemoteError> for AccessError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Http { message, retryable } => AccessError::Transport { message, retryable },
            RemoteError::Status { status, body } => body.into_error(status),
            RemoteError::Codec(message) => AccessError::Codec(message),
            RemoteError::NotConnected => AccessError::NotConnected,
        }
    }
}
