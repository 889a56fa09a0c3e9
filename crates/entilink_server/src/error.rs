//! Error types for the request handler.

use entilink_core::AccessError;
use entilink_remote::wire::{error_response, ErrorBody, ErrorKind};
use entilink_remote::HttpResponse;
use thiserror::Error;

/// Result type for request handling.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Too many ids in one request.
    #[error("too many ids: {requested} > {limit}")]
    TooManyIds {
        /// Ids in the request.
        requested: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Request body is not valid JSON for the route.
    #[error("invalid body: {0}")]
    Body(#[from] serde_json::Error),

    /// The served controller failed.
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }

    /// The HTTP status to answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::Access(err) => ErrorBody::from_error(err).0,
            _ => 400,
        }
    }

    /// Builds the error response.
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Access(err) => error_response(&err),
            Self::InvalidRequest(_) | Self::TooManyIds { .. } => HttpResponse::json(
                400,
                &ErrorBody::new(ErrorKind::InvalidOperation, self.to_string()),
            ),
            Self::Body(_) => HttpResponse::json(
                400,
                &ErrorBody::new(ErrorKind::InvalidValue, self.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entilink_core::EntityId;

    #[test]
    fn statuses() {
        assert_eq!(ServerError::InvalidRequest("x".into()).status(), 400);
        let missing = ServerError::from(AccessError::not_found("Book", EntityId::new(1)));
        assert_eq!(missing.status(), 404);
        assert!(missing.is_client_error());
        let closed = ServerError::from(AccessError::Closed);
        assert_eq!(closed.status(), 503);
        assert!(!closed.is_client_error());
    }

    #[test]
    fn too_many_ids_is_a_bad_request() {
        let response = ServerError::TooManyIds {
            requested: 5,
            limit: 2,
        }
        .into_response();
        assert_eq!(response.status, 400);
        let body: ErrorBody = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body.kind, ErrorKind::InvalidOperation);
    }
}
