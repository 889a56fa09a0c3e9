//! Error types for the EntiLink access layer.

use crate::model::EntityId;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type for access-layer operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors raised by controllers, decorators and entity accessors.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A negative id reached a read or write path.
    #[error("malicious id {id} for type {type_name}")]
    MaliciousId {
        /// Entity type the id was used with.
        type_name: String,
        /// The offending id.
        id: EntityId,
    },

    /// The entity handed to a write is not the instance held by the cache.
    #[error("uncached entity {type_name} id={id}")]
    UncachedEntity {
        /// Entity type.
        type_name: String,
        /// Entity id.
        id: EntityId,
    },

    /// The in-memory version token differs from the persisted one.
    #[error("{type_name} id={id} is out of synchronization (local {local:?}, stored {stored:?})")]
    OutOfSync {
        /// Entity type.
        type_name: String,
        /// Entity id.
        id: EntityId,
        /// Token carried by the in-memory instance.
        local: Option<u64>,
        /// Authoritative token.
        stored: Option<u64>,
    },

    /// A freshly created entity collided with an already cached id.
    #[error("duplicate id on create: {type_name} id={id} is already cached")]
    DuplicateId {
        /// Entity type.
        type_name: String,
        /// Colliding id.
        id: EntityId,
    },

    /// A relation could not be resolved when a caller required it.
    #[error("relation {field} of {type_name} id={id} could not be resolved")]
    Unresolved {
        /// Entity type.
        type_name: String,
        /// Entity id.
        id: EntityId,
        /// Relation field name.
        field: String,
    },

    /// The backend holds no row for the id.
    #[error("{type_name} id={id} not found")]
    NotFound {
        /// Entity type.
        type_name: String,
        /// Missing id.
        id: EntityId,
    },

    /// The type name is not known to the registry.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// The field name is not declared on the type.
    #[error("unknown field {field} on {type_name}")]
    UnknownField {
        /// Entity type.
        type_name: String,
        /// Field name.
        field: String,
    },

    /// A field value failed validation.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// The call is not legal in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The container does not support this operation.
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Name of the unsupported operation.
        operation: &'static str,
    },

    /// Remote transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
        /// Whether repeating the call may succeed.
        retryable: bool,
    },

    /// Failure inside a backend, wrapped with context.
    #[error("{context}: {source}")]
    Backend {
        /// What the backend was doing.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Serialization or deserialization failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// The entity-access capability behind a lazy handle has been dropped.
    #[error("entity access is no longer available")]
    Detached,

    /// The controller has been closed.
    #[error("controller is closed")]
    Closed,

    /// The remote transport is not connected.
    #[error("not connected")]
    NotConnected,
}

impl AccessError {
    /// Creates a malicious id error.
    pub fn malicious_id(type_name: impl Into<String>, id: EntityId) -> Self {
        Self::MaliciousId {
            type_name: type_name.into(),
            id,
        }
    }

    /// Creates an uncached entity error.
    pub fn uncached(type_name: impl Into<String>, id: EntityId) -> Self {
        Self::UncachedEntity {
            type_name: type_name.into(),
            id,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(type_name: impl Into<String>, id: EntityId) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            id,
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Wraps a backend error with context.
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true if repeating the call may succeed.
    ///
    /// Validation and consistency errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }

    /// Returns true for errors signalling a caller or cache-invariant violation.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Self::UncachedEntity { .. }
                | Self::OutOfSync { .. }
                | Self::DuplicateId { .. }
                | Self::MaliciousId { .. }
        )
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_transport_errors_are_retryable() {
        assert!(AccessError::transport_retryable("timeout").is_retryable());
        assert!(!AccessError::transport_fatal("bad certificate").is_retryable());
        assert!(!AccessError::malicious_id("Book", EntityId::new(-3)).is_retryable());
        assert!(!AccessError::uncached("Book", EntityId::new(1)).is_retryable());
    }

    #[test]
    fn consistency_violations_are_classified() {
        assert!(AccessError::uncached("Book", EntityId::new(1)).is_consistency_violation());
        assert!(!AccessError::not_found("Book", EntityId::new(1)).is_consistency_violation());
    }

    #[test]
    fn backend_error_keeps_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = AccessError::backend("appending journal record", io);
        assert_eq!(err.to_string(), "appending journal record: disk full");
        assert!(err.source().is_some());
    }
}
