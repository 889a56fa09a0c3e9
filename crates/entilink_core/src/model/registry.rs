//! Entity type registry.
//!
//! The registry is built once from a [`ModelDescription`] and shared as
//! `Arc<TypeRegistry>` with every component that needs type lookups.
//! Each model is reachable under its canonical name, its implementation
//! alias and its transfer alias; lookups ignore ASCII case.

use super::{PrimitiveKind, RelationKind};
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Serializable description of all entity types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Entity descriptions.
    pub entities: Vec<EntityDescription>,
}

impl ModelDescription {
    /// Creates an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity description.
    #[must_use]
    pub fn entity(mut self, entity: EntityDescription) -> Self {
        self.entities.push(entity);
        self
    }
}

/// Serializable description of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Canonical type name.
    pub name: String,
    /// Implementation alias, defaults to `{name}Impl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    /// Transfer alias, defaults to `{name}Dto`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<String>,
    /// Whether instances carry a version token.
    #[serde(default)]
    pub versioned: bool,
    /// Primitive fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
    /// Relation fields in declaration order.
    #[serde(default)]
    pub relations: Vec<RelationDescription>,
}

impl EntityDescription {
    /// Starts a description for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementation: None,
            transfer: None,
            versioned: false,
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Marks the type as carrying a version token.
    #[must_use]
    pub fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }

    /// Adds a primitive field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.fields.push(FieldDescription {
            name: name.into(),
            kind,
        });
        self
    }

    /// Adds a relation field.
    #[must_use]
    pub fn relation(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        kind: RelationKind,
        counter: Option<&str>,
    ) -> Self {
        self.relations.push(RelationDescription {
            name: name.into(),
            target: target.into(),
            kind,
            counter: counter.map(str::to_owned),
        });
        self
    }
}

/// Serializable description of a primitive field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    /// Field name.
    pub name: String,
    /// Storage kind.
    pub kind: PrimitiveKind,
}

/// Serializable description of a relation field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescription {
    /// Field name.
    pub name: String,
    /// Canonical name of the related type.
    pub target: String,
    /// Relation kind seen from the declaring type.
    pub kind: RelationKind,
    /// Name of the inverse relation on the target, if bidirectional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
}

/// A primitive field of an entity model.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveField {
    /// Field name.
    pub name: String,
    /// Storage kind.
    pub kind: PrimitiveKind,
}

/// A relation field of an entity model.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationField {
    /// Field name.
    pub name: String,
    /// Canonical name of the related type.
    pub target: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Inverse relation on the target.
    pub counter: Option<String>,
}

impl RelationField {
    /// Returns true when the field holds a collection.
    pub fn is_many(&self) -> bool {
        self.kind.is_second_many()
    }
}

/// Resolved model of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityModel {
    name: String,
    implementation: String,
    transfer: String,
    versioned: bool,
    fields: Vec<PrimitiveField>,
    relations: Vec<RelationField>,
}

impl EntityModel {
    /// Canonical type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Implementation alias.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Transfer alias.
    pub fn transfer(&self) -> &str {
        &self.transfer
    }

    /// Whether instances carry a version token.
    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    /// Primitive fields in declaration order.
    pub fn fields(&self) -> &[PrimitiveField] {
        &self.fields
    }

    /// Relation fields in declaration order.
    pub fn relations(&self) -> &[RelationField] {
        &self.relations
    }

    /// Position of a primitive field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Position of a relation field.
    pub fn relation_index(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r.name == name)
    }

    /// Path segment used by the REST surface.
    pub fn path(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Looks up a primitive field, failing with `UnknownField`.
    pub fn field_position(&self, name: &str) -> AccessResult<usize> {
        self.field_index(name).ok_or_else(|| AccessError::UnknownField {
            type_name: self.name.clone(),
            field: name.to_owned(),
        })
    }

    /// Looks up a relation field, failing with `UnknownField`.
    pub fn relation_position(&self, name: &str) -> AccessResult<usize> {
        self.relation_index(name).ok_or_else(|| AccessError::UnknownField {
            type_name: self.name.clone(),
            field: name.to_owned(),
        })
    }
}

/// Immutable lookup table from type names to entity models.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    models: Vec<Arc<EntityModel>>,
    names: HashMap<String, usize>,
}

impl TypeRegistry {
    /// Builds and validates a registry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - two types or aliases share a name
    /// - a type declares the same field twice
    /// - a relation targets an unknown type
    /// - a counter field is missing or does not point back
    pub fn from_description(description: &ModelDescription) -> AccessResult<Self> {
        let mut registry = Self::default();
        for entity in &description.entities {
            let model = EntityModel {
                name: entity.name.clone(),
                implementation: entity
                    .implementation
                    .clone()
                    .unwrap_or_else(|| format!("{}Impl", entity.name)),
                transfer: entity
                    .transfer
                    .clone()
                    .unwrap_or_else(|| format!("{}Dto", entity.name)),
                versioned: entity.versioned,
                fields: entity
                    .fields
                    .iter()
                    .map(|f| PrimitiveField {
                        name: f.name.clone(),
                        kind: f.kind.clone(),
                    })
                    .collect(),
                relations: entity
                    .relations
                    .iter()
                    .map(|r| RelationField {
                        name: r.name.clone(),
                        target: r.target.clone(),
                        kind: r.kind,
                        counter: r.counter.clone(),
                    })
                    .collect(),
            };
            registry.insert(model)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parses a JSON model description and builds the registry.
    pub fn from_json(json: &str) -> AccessResult<Self> {
        let description: ModelDescription = serde_json::from_str(json)?;
        Self::from_description(&description)
    }

    fn insert(&mut self, model: EntityModel) -> AccessResult<()> {
        let mut names: Vec<&str> = model
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(model.relations.iter().map(|r| r.name.as_str()))
            .collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(AccessError::invalid_operation(format!(
                "{} declares field {} twice",
                model.name, dup[0]
            )));
        }

        let index = self.models.len();
        for alias in [&model.name, &model.implementation, &model.transfer] {
            let key = alias.to_ascii_lowercase();
            if self.names.insert(key, index).is_some() {
                return Err(AccessError::invalid_operation(format!(
                    "type name {alias} is declared twice"
                )));
            }
        }
        self.models.push(Arc::new(model));
        Ok(())
    }

    fn validate(&self) -> AccessResult<()> {
        for model in &self.models {
            for relation in &model.relations {
                let target = self.require(&relation.target)?;
                let Some(counter) = &relation.counter else {
                    continue;
                };
                let inverse = target
                    .relations
                    .iter()
                    .find(|r| &r.name == counter)
                    .ok_or_else(|| AccessError::UnknownField {
                        type_name: target.name.clone(),
                        field: counter.clone(),
                    })?;
                let points_back = self
                    .canonical_name(&inverse.target)
                    .is_some_and(|n| n == model.name);
                if !points_back || inverse.kind != relation.kind.inverse() {
                    return Err(AccessError::invalid_operation(format!(
                        "{}.{} and {}.{} are not inverse relations",
                        model.name, relation.name, target.name, counter
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the model registered under `name` or one of its aliases.
    pub fn model(&self, name: &str) -> Option<&Arc<EntityModel>> {
        self.names
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.models[i])
    }

    /// Returns the model for `name`, failing with `UnknownType`.
    pub fn require(&self, name: &str) -> AccessResult<&Arc<EntityModel>> {
        self.model(name)
            .ok_or_else(|| AccessError::UnknownType(name.to_owned()))
    }

    /// Resolves any alias to the canonical type name.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.model(name).map(|m| m.name())
    }

    /// Iterates over all models in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<EntityModel>> {
        self.models.iter()
    }

    /// Constructs a blank, unassigned instance of `name`.
    pub fn new_instance(&self, name: &str) -> AccessResult<EntityRef> {
        Ok(EntityRef::blank(Arc::clone(self.require(name)?)))
    }
}
