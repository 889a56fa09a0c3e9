//! Entity model: identifiers, field kinds, values and the type registry.

mod kind;
mod registry;
mod value;

pub use kind::{PrimitiveKind, RelationKind};
pub use registry::{
    EntityDescription, EntityModel, FieldDescription, ModelDescription, PrimitiveField,
    RelationDescription, RelationField, TypeRegistry,
};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric entity identifier.
///
/// Persisted entities carry an id `>= 0`. Any negative id is a sentinel
/// for "not yet assigned".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// The id of an entity that has not been persisted.
    pub const UNASSIGNED: Self = Self(-1);

    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Returns true for ids that reference a persisted entity.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 >= 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl From<i64> for EntityId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque optimistic-concurrency token.
///
/// Backends issue tokens from a monotonically increasing millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(u64);

impl VersionToken {
    /// Wraps a raw token.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
