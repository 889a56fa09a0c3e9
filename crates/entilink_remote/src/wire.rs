//! REST surface: routes and error bodies.
//!
//! All routes live below a configurable prefix, `/entity` by default:
//!
//! ```text
//! GET    /{type}                 all transfer objects
//! GET    /{type}?id=1,2          transfer objects by id
//! GET    /{type}/id              all ids
//! GET    /{type}/count           number of entities
//! GET    /{type}/{id}            one transfer object
//! GET    /{type}/{id}/version    version token or null
//! POST   /{type}                 create from a transfer object
//! PUT    /{type}/{id}            update from a transfer object
//! DELETE /{type}/{id}            delete
//! ```
//!
//! `{type}` is the lowercase type name. Bodies are JSON.

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use entilink_core::{AccessError, EntityId};
use serde::{Deserialize, Serialize};

/// Default route prefix.
pub const DEFAULT_PREFIX: &str = "/entity";

/// Default cap on the ids in one `?id=` query.
pub const DEFAULT_MAX_IDS: usize = 1000;

/// One REST operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// All entities of a type.
    List(String),
    /// Entities by id.
    ByIds(String, Vec<EntityId>),
    /// All ids of a type.
    Ids(String),
    /// Entity count.
    Count(String),
    /// One entity.
    One(String, EntityId),
    /// Persisted version token.
    Version(String, EntityId),
    /// Create.
    Create(String),
    /// Update.
    Update(String, EntityId),
    /// Delete.
    Delete(String, EntityId),
}

impl Route {
    /// Builds the request for this route below `prefix`.
    pub fn request(&self, prefix: &str) -> HttpRequest {
        match self {
            Self::List(path) => HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}")),
            Self::ByIds(path, ids) => HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}"))
                .with_query("id", format_ids(ids)),
            Self::Ids(path) => HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}/id")),
            Self::Count(path) => HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}/count")),
            Self::One(path, id) => HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}/{id}")),
            Self::Version(path, id) => {
                HttpRequest::new(HttpMethod::Get, format!("{prefix}/{path}/{id}/version"))
            }
            Self::Create(path) => HttpRequest::new(HttpMethod::Post, format!("{prefix}/{path}")),
            Self::Update(path, id) => HttpRequest::new(HttpMethod::Put, format!("{prefix}/{path}/{id}")),
            Self::Delete(path, id) => {
                HttpRequest::new(HttpMethod::Delete, format!("{prefix}/{path}/{id}"))
            }
        }
    }

    /// Recognizes the route of an incoming request.
    ///
    /// # Errors
    ///
    /// Returns the error body to answer with: 404 for unknown paths,
    /// 400 for unparsable ids, 405 for unsupported methods.
    pub fn parse(request: &HttpRequest, prefix: &str) -> Result<Self, (u16, ErrorBody)> {
        let not_found = || {
            (
                404,
                ErrorBody::new(ErrorKind::NotFound, format!("no route for {}", request.path)),
            )
        };
        let rest = request.path.strip_prefix(prefix).ok_or_else(not_found)?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let method = request.method;
        let not_allowed = || {
            (
                405,
                ErrorBody::new(
                    ErrorKind::InvalidOperation,
                    format!("{method} is not allowed on {}", request.path),
                ),
            )
        };

        match segments.as_slice() {
            [path] => {
                let path = (*path).to_owned();
                match method {
                    HttpMethod::Get => match request.query_param("id") {
                        Some(ids) => Ok(Self::ByIds(path, parse_ids(ids).map_err(bad_request)?)),
                        None => Ok(Self::List(path)),
                    },
                    HttpMethod::Post => Ok(Self::Create(path)),
                    _ => Err(not_allowed()),
                }
            }
            [path, "id"] if method == HttpMethod::Get => Ok(Self::Ids((*path).to_owned())),
            [path, "count"] if method == HttpMethod::Get => Ok(Self::Count((*path).to_owned())),
            [path, id] => {
                let path = (*path).to_owned();
                let id = parse_id(id).map_err(bad_request)?;
                match method {
                    HttpMethod::Get => Ok(Self::One(path, id)),
                    HttpMethod::Put => Ok(Self::Update(path, id)),
                    HttpMethod::Delete => Ok(Self::Delete(path, id)),
                    HttpMethod::Post => Err(not_allowed()),
                }
            }
            [path, id, "version"] if method == HttpMethod::Get => {
                Ok(Self::Version((*path).to_owned(), parse_id(id).map_err(bad_request)?))
            }
            _ => Err(not_found()),
        }
    }
}

fn bad_request(message: String) -> (u16, ErrorBody) {
    (400, ErrorBody::new(ErrorKind::InvalidValue, message))
}

/// Formats ids as a comma-separated list.
pub fn format_ids(ids: &[EntityId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_id(raw: &str) -> Result<EntityId, String> {
    raw.trim()
        .parse::<i64>()
        .map(EntityId::new)
        .map_err(|_| format!("invalid id {raw:?}"))
}

/// Parses a comma-separated id list.
pub fn parse_ids(raw: &str) -> Result<Vec<EntityId>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_id)
        .collect()
}

/// Error categories carried in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Negative id.
    MaliciousId,
    /// Unknown type name.
    UnknownType,
    /// Unknown field name.
    UnknownField,
    /// Field value rejected.
    InvalidValue,
    /// Illegal request.
    InvalidOperation,
    /// No such entity.
    NotFound,
    /// Stale version token.
    OutOfSync,
    /// Other consistency conflict.
    Conflict,
    /// The backend is closed.
    Closed,
    /// Anything else.
    Internal,
}

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Entity type, if the error concerns one entity.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Entity id, if the error concerns one entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Field name, for field errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Version sent by the client, for `out_of_sync`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<u64>,
    /// Stored version, for `out_of_sync`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<u64>,
}

impl ErrorBody {
    /// Creates a body with only a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            type_name: None,
            id: None,
            field: None,
            local: None,
            stored: None,
        }
    }

    fn about(mut self, type_name: &str, id: EntityId) -> Self {
        self.type_name = Some(type_name.to_owned());
        self.id = Some(id);
        self
    }

    /// Describes `err` and picks the status to answer with.
    pub fn from_error(err: &AccessError) -> (u16, Self) {
        let message = err.to_string();
        match err {
            AccessError::MaliciousId { type_name, id } => {
                (400, Self::new(ErrorKind::MaliciousId, message).about(type_name, *id))
            }
            AccessError::UnknownType(type_name) => {
                let mut body = Self::new(ErrorKind::UnknownType, message);
                body.type_name = Some(type_name.clone());
                (400, body)
            }
            AccessError::UnknownField { type_name, field } => {
                let mut body = Self::new(ErrorKind::UnknownField, message);
                body.type_name = Some(type_name.clone());
                body.field = Some(field.clone());
                (400, body)
            }
            AccessError::InvalidValue { field, .. } => {
                let mut body = Self::new(ErrorKind::InvalidValue, message);
                body.field = Some(field.clone());
                (400, body)
            }
            AccessError::InvalidOperation { .. } | AccessError::Unsupported { .. } => {
                (400, Self::new(ErrorKind::InvalidOperation, message))
            }
            AccessError::NotFound { type_name, id } => {
                (404, Self::new(ErrorKind::NotFound, message).about(type_name, *id))
            }
            AccessError::OutOfSync {
                type_name,
                id,
                local,
                stored,
            } => {
                let mut body = Self::new(ErrorKind::OutOfSync, message).about(type_name, *id);
                body.local = *local;
                body.stored = *stored;
                (409, body)
            }
            AccessError::UncachedEntity { type_name, id }
            | AccessError::DuplicateId { type_name, id }
            | AccessError::Unresolved { type_name, id, .. } => {
                (409, Self::new(ErrorKind::Conflict, message).about(type_name, *id))
            }
            AccessError::Closed | AccessError::NotConnected => {
                (503, Self::new(ErrorKind::Closed, message))
            }
            _ => (500, Self::new(ErrorKind::Internal, message)),
        }
    }

    /// Turns a received error body back into an access error.
    pub fn into_error(self, status: u16) -> AccessError {
        if status >= 500 {
            return AccessError::Transport {
                message: format!("server returned {status}: {}", self.message),
                retryable: true,
            };
        }
        let type_name = self.type_name.unwrap_or_default();
        let id = self.id.unwrap_or_default();
        match self.kind {
            ErrorKind::MaliciousId => AccessError::MaliciousId { type_name, id },
            ErrorKind::UnknownType => AccessError::UnknownType(type_name),
            ErrorKind::UnknownField => AccessError::UnknownField {
                type_name,
                field: self.field.unwrap_or_default(),
            },
            ErrorKind::InvalidValue => AccessError::InvalidValue {
                field: self.field.unwrap_or_default(),
                message: self.message,
            },
            ErrorKind::NotFound if self.id.is_some() => AccessError::NotFound { type_name, id },
            ErrorKind::OutOfSync => AccessError::OutOfSync {
                type_name,
                id,
                local: self.local,
                stored: self.stored,
            },
            ErrorKind::Closed => AccessError::Transport {
                message: self.message,
                retryable: true,
            },
            _ => AccessError::InvalidOperation {
                message: format!("server returned {status}: {}", self.message),
            },
        }
    }
}

/// Builds the response for a failed request.
pub fn error_response(err: &AccessError) -> HttpResponse {
    let (status, body) = ErrorBody::from_error(err);
    HttpResponse::json(status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(method: HttpMethod, path: &str) -> Result<Route, u16> {
        Route::parse(&HttpRequest::new(method, path), DEFAULT_PREFIX).map_err(|(s, _)| s)
    }

    #[test]
    fn routes_round_trip_through_requests() {
        let routes = [
            Route::List("book".into()),
            Route::ByIds("book".into(), vec![EntityId::new(1), EntityId::new(2)]),
            Route::Ids("book".into()),
            Route::Count("book".into()),
            Route::One("book".into(), EntityId::new(3)),
            Route::Version("book".into(), EntityId::new(3)),
            Route::Create("book".into()),
            Route::Update("book".into(), EntityId::new(3)),
            Route::Delete("book".into(), EntityId::new(3)),
        ];
        for route in routes {
            let request = route.request(DEFAULT_PREFIX);
            assert_eq!(Route::parse(&request, DEFAULT_PREFIX).unwrap(), route);
        }
    }

    #[test]
    fn unknown_paths_and_methods() {
        assert_eq!(parse(HttpMethod::Get, "/other/book"), Err(404));
        assert_eq!(parse(HttpMethod::Get, "/entity/book/1/2/3"), Err(404));
        assert_eq!(parse(HttpMethod::Put, "/entity/book"), Err(405));
        assert_eq!(parse(HttpMethod::Get, "/entity/book/abc"), Err(400));
    }

    #[test]
    fn id_lists() {
        assert_eq!(format_ids(&[EntityId::new(1), EntityId::new(20)]), "1,20");
        assert_eq!(parse_ids("1, 20,").unwrap(), vec![EntityId::new(1), EntityId::new(20)]);
        assert!(parse_ids("1,x").is_err());
    }

    #[test]
    fn out_of_sync_survives_the_wire() {
        let err = AccessError::OutOfSync {
            type_name: "Book".into(),
            id: EntityId::new(4),
            local: Some(1),
            stored: Some(2),
        };
        let (status, body) = ErrorBody::from_error(&err);
        assert_eq!(status, 409);
        let json = serde_json::to_vec(&body).unwrap();
        let body: ErrorBody = serde_json::from_slice(&json).unwrap();
        assert!(matches!(
            body.into_error(status),
            AccessError::OutOfSync { id, local: Some(1), stored: Some(2), .. } if id == EntityId::new(4)
        ));
    }

    #[test]
    fn server_errors_are_retryable() {
        let body = ErrorBody::new(ErrorKind::Internal, "boom");
        assert!(body.into_error(500).is_retryable());
        let body = ErrorBody::new(ErrorKind::NotFound, "no route");
        assert!(matches!(body.into_error(404), AccessError::InvalidOperation { .. }));
    }
}
