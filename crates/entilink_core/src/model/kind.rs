use serde::{Deserialize, Serialize};

/// Storage kind of a primitive field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// Signed integer.
    Int,
    /// Boolean flag.
    Boolean,
    /// Character data bounded by `max_len` characters.
    Text {
        /// Maximum number of characters.
        max_len: usize,
    },
    /// Point in time as epoch milliseconds.
    Date,
    /// Exact decimal held as its canonical string form.
    Numeric {
        /// Maximum number of significant digits.
        precision: u32,
        /// Maximum number of fractional digits.
        scale: u32,
    },
    /// One of a closed set of names.
    Enum {
        /// Name of the enumeration.
        name: String,
        /// Allowed options.
        options: Vec<String>,
    },
}

/// Cardinality and direction of a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// One owner, one related entity.
    OneToOne,
    /// One owner, many related entities.
    OneToMany,
    /// Many owners share one related entity.
    ManyToOne,
    /// Many owners, many related entities.
    ManyToMany,
}

impl RelationKind {
    /// Returns true when the declaring side may be one of many.
    #[must_use]
    pub const fn is_first_many(self) -> bool {
        matches!(self, Self::ManyToOne | Self::ManyToMany)
    }

    /// Returns true when the field holds a collection.
    #[must_use]
    pub const fn is_second_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Returns the kind seen from the other side of the relation.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_flags() {
        assert!(RelationKind::OneToMany.is_second_many());
        assert!(!RelationKind::OneToMany.is_first_many());
        assert!(RelationKind::ManyToOne.is_first_many());
        assert!(!RelationKind::ManyToOne.is_second_many());
        assert!(RelationKind::ManyToMany.is_first_many() && RelationKind::ManyToMany.is_second_many());
        assert!(!RelationKind::OneToOne.is_first_many() && !RelationKind::OneToOne.is_second_many());
    }

    #[test]
    fn inverse_swaps_sides() {
        for kind in [
            RelationKind::OneToOne,
            RelationKind::OneToMany,
            RelationKind::ManyToOne,
            RelationKind::ManyToMany,
        ] {
            assert_eq!(kind.inverse().inverse(), kind);
            assert_eq!(kind.inverse().is_first_many(), kind.is_second_many());
        }
    }

    #[test]
    fn kinds_read_from_json() {
        let kind: PrimitiveKind =
            serde_json::from_str(r#"{"type":"numeric","precision":6,"scale":2}"#).unwrap();
        assert_eq!(kind, PrimitiveKind::Numeric { precision: 6, scale: 2 });
        let rel: RelationKind = serde_json::from_str(r#""many_to_one""#).unwrap();
        assert_eq!(rel, RelationKind::ManyToOne);
    }
}
