//! Transfer objects: the serializable form of an entity.

use crate::entity::Entity;
use crate::model::{EntityId, VersionToken};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable snapshot of one entity.
///
/// Primitive values are kept in their wire form. To-one relations map to
/// the related id, or [`EntityId::UNASSIGNED`] when empty; to-many
/// relations map to the ordered id list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferObject {
    /// Canonical type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Entity id.
    pub id: EntityId,
    /// Version token, for versioned types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
    /// Primitive values by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// To-one relation ids by field name.
    #[serde(default)]
    pub one: BTreeMap<String, EntityId>,
    /// To-many relation ids by field name.
    #[serde(default)]
    pub many: BTreeMap<String, Vec<EntityId>>,
}

impl TransferObject {
    /// Creates an empty transfer object for `type_name`.
    pub fn new(type_name: impl Into<String>, id: EntityId) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            ..Self::default()
        }
    }

    /// Snapshots `entity` without fetching any relation.
    pub fn from_entity(entity: &Entity) -> Self {
        let model = entity.model();
        let values = entity.fields();
        let mut transfer = Self::new(model.name(), entity.id());
        transfer.version = entity.version();
        for (field, value) in model.fields().iter().zip(values) {
            transfer.fields.insert(field.name.clone(), value.to_json());
        }
        for (index, relation) in model.relations().iter().enumerate() {
            let ids = entity.relation_ids_at(index);
            if relation.is_many() {
                transfer.many.insert(relation.name.clone(), ids);
            } else {
                let id = ids.first().copied().unwrap_or(EntityId::UNASSIGNED);
                transfer.one.insert(relation.name.clone(), id);
            }
        }
        transfer
    }

    /// Sets a primitive wire value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Sets a to-one relation id.
    #[must_use]
    pub fn with_one(mut self, name: impl Into<String>, id: EntityId) -> Self {
        self.one.insert(name.into(), id);
        self
    }

    /// Sets a to-many relation id list.
    #[must_use]
    pub fn with_many(mut self, name: impl Into<String>, ids: Vec<EntityId>) -> Self {
        self.many.insert(name.into(), ids);
        self
    }

    /// Sets the version token.
    #[must_use]
    pub fn with_version(mut self, version: VersionToken) -> Self {
        self.version = Some(version);
        self
    }

    /// Every id this object references, with the relation it belongs to.
    pub fn references(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.one
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .chain(
                self.many
                    .iter()
                    .flat_map(|(name, ids)| ids.iter().map(move |id| (name.as_str(), *id))),
            )
            .filter(|(_, id)| id.is_assigned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::library;
    use serde_json::json;

    #[test]
    fn snapshot_carries_fields_and_relation_ids() {
        let registry = library();
        let author = registry.new_instance("Author").unwrap();
        let book = registry.new_instance("Book").unwrap();
        author.set_id(EntityId::new(2));
        book.set_id(EntityId::new(8));
        book.set_field("title", "Emma").unwrap();
        book.set_related("author", Some(&author)).unwrap();

        let dto = TransferObject::from_entity(&book);
        assert_eq!(dto.type_name, "Book");
        assert_eq!(dto.fields["title"], json!("Emma"));
        assert_eq!(dto.fields["pages"], serde_json::Value::Null);
        assert_eq!(dto.one["author"], EntityId::new(2));
        assert_eq!(dto.many["tags"], Vec::<EntityId>::new());

        let author_dto = TransferObject::from_entity(&author);
        assert_eq!(author_dto.many["books"], vec![EntityId::new(8)]);
    }

    #[test]
    fn unset_to_one_is_the_sentinel() {
        let registry = library();
        let book = registry.new_instance("Book").unwrap();
        let dto = TransferObject::from_entity(&book);
        assert_eq!(dto.one["author"], EntityId::UNASSIGNED);
        assert_eq!(dto.references().count(), 0);
    }

    #[test]
    fn wire_form_uses_type_key() {
        let dto = TransferObject::new("Tag", EntityId::new(3)).with_field("label", json!("sf"));
        let text = serde_json::to_string(&dto).unwrap();
        assert!(text.contains(r#""type":"Tag""#));
        let back: TransferObject = serde_json::from_str(&text).unwrap();
        assert_eq!(back, dto);
    }
}
