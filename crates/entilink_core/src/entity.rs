//! Entities and their relation slots.
//!
//! An [`EntityRef`] is a shared handle to one in-memory entity; two handles
//! denote the same instance exactly when [`EntityRef::ptr_eq`] holds.
//! Primitive fields are stored eagerly. Each relation field is a slot that
//! holds the resolved related entities plus, for stand-ins built from a
//! transfer object, the ids still waiting to be fetched.
//!
//! Relation accessors resolve their slot before reading or writing it and
//! keep the counter field of the related entities in step. Locks are
//! never held across a fetch or while another entity is touched.

use crate::error::{AccessError, AccessResult};
use crate::fetch::FetchKey;
use crate::model::{EntityId, EntityModel, RelationField, Value, VersionToken};
use crate::standin::RelationLoader;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Current content of a relation slot.
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// Zero or one related entity.
    One(Option<EntityRef>),
    /// Related entities in insertion order.
    Many(Vec<EntityRef>),
}

#[derive(Debug, Clone)]
struct RelationSlot {
    value: RelationValue,
    pending: Option<Vec<EntityId>>,
}

impl RelationSlot {
    fn empty(relation: &RelationField) -> Self {
        let value = if relation.is_many() {
            RelationValue::Many(Vec::new())
        } else {
            RelationValue::One(None)
        };
        Self {
            value,
            pending: None,
        }
    }
}

#[derive(Debug)]
struct EntityState {
    id: EntityId,
    version: Option<VersionToken>,
    fields: Vec<Value>,
    relations: Vec<RelationSlot>,
}

/// One in-memory entity.
pub struct Entity {
    model: Arc<EntityModel>,
    state: RwLock<EntityState>,
    loader: Option<RelationLoader>,
    resolved: AtomicBool,
}

/// Shared handle to an [`Entity`].
#[derive(Clone)]
pub struct EntityRef(Arc<Entity>);

impl Deref for EntityRef {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.0
    }
}

impl Entity {
    /// The entity's model.
    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    /// Canonical type name.
    pub fn type_name(&self) -> &str {
        self.model.name()
    }

    /// Current id.
    pub fn id(&self) -> EntityId {
        self.state.read().id
    }

    /// Assigns the id. Used by backends when persisting.
    pub fn set_id(&self, id: EntityId) {
        self.state.write().id = id;
    }

    /// Current version token.
    pub fn version(&self) -> Option<VersionToken> {
        self.state.read().version
    }

    /// Replaces the version token. Used by backends after a write.
    pub fn set_version(&self, version: Option<VersionToken>) {
        self.state.write().version = version;
    }

    /// Reads a primitive field by name.
    pub fn field(&self, name: &str) -> AccessResult<Value> {
        let index = self.model.field_position(name)?;
        Ok(self.state.read().fields[index].clone())
    }

    /// Reads a primitive field by position.
    pub fn field_at(&self, index: usize) -> Option<Value> {
        self.state.read().fields.get(index).cloned()
    }

    /// Snapshot of all primitive values in declaration order.
    pub fn fields(&self) -> Vec<Value> {
        self.state.read().fields.clone()
    }

    /// Writes a primitive field after validating it against its kind.
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> AccessResult<()> {
        let index = self.model.field_position(name)?;
        self.set_field_at(index, value.into())
    }

    /// Writes a primitive field by position.
    pub fn set_field_at(&self, index: usize, value: Value) -> AccessResult<()> {
        let field = self.model.fields().get(index).ok_or_else(|| {
            AccessError::invalid_operation(format!(
                "{} has no field at position {index}",
                self.type_name()
            ))
        })?;
        value.validate(&field.name, &field.kind)?;
        self.state.write().fields[index] = value;
        Ok(())
    }

    /// Returns true if the named relation needs no further fetch.
    pub fn is_resolved(&self, name: &str) -> AccessResult<bool> {
        let index = self.model.relation_position(name)?;
        Ok(self.state.read().relations[index].pending.is_none())
    }

    /// Returns true once every relation slot is resolved.
    pub fn is_fully_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Ids of the named relation without fetching anything.
    pub fn relation_ids(&self, name: &str) -> AccessResult<Vec<EntityId>> {
        let index = self.model.relation_position(name)?;
        Ok(self.relation_ids_at(index))
    }

    /// Ids of the relation at `index` without fetching anything.
    ///
    /// Related entities that have not been persisted yet are left out.
    pub fn relation_ids_at(&self, index: usize) -> Vec<EntityId> {
        let (value, pending) = {
            let state = self.state.read();
            let Some(slot) = state.relations.get(index) else {
                return Vec::new();
            };
            (slot.value.clone(), slot.pending.clone())
        };
        let mut ids: Vec<EntityId> = match value {
            RelationValue::One(one) => one.map(|e| e.id()).into_iter().collect(),
            RelationValue::Many(many) => many.iter().map(|e| e.id()).collect(),
        };
        ids.extend(pending.unwrap_or_default());
        ids.retain(|id| id.is_assigned());
        ids
    }

    fn recompute_resolved(&self) {
        let all = self.state.read().relations.iter().all(|s| s.pending.is_none());
        self.resolved.store(all, Ordering::Release);
    }
}

impl EntityRef {
    /// Creates a blank, fully resolved, unassigned entity.
    pub fn blank(model: Arc<EntityModel>) -> Self {
        Self::build(model, EntityId::UNASSIGNED, None, None)
    }

    pub(crate) fn build(
        model: Arc<EntityModel>,
        id: EntityId,
        version: Option<VersionToken>,
        loader: Option<RelationLoader>,
    ) -> Self {
        let state = EntityState {
            id,
            version,
            fields: vec![Value::Null; model.fields().len()],
            relations: model.relations().iter().map(RelationSlot::empty).collect(),
        };
        Self(Arc::new(Entity {
            model,
            state: RwLock::new(state),
            loader,
            resolved: AtomicBool::new(true),
        }))
    }

    /// Stores primitive values and pending relation ids on a fresh stand-in.
    pub(crate) fn prime(&self, fields: Vec<Value>, pending: Vec<Option<Vec<EntityId>>>) {
        {
            let mut state = self.state.write();
            state.fields = fields;
            for (slot, ids) in state.relations.iter_mut().zip(pending) {
                slot.pending = ids;
            }
        }
        self.recompute_resolved();
    }

    /// Returns true if both handles denote the same instance.
    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns true if both handles carry the same type and id.
    pub fn same_identity(&self, other: &EntityRef) -> bool {
        self.type_name() == other.type_name() && self.id() == other.id()
    }

    /// Reads a to-one relation, resolving it first.
    pub fn related_one(&self, name: &str) -> AccessResult<Option<EntityRef>> {
        let index = self.relation_of_kind(name, false)?;
        self.ensure_resolved(index);
        match &self.state.read().relations[index].value {
            RelationValue::One(one) => Ok(one.clone()),
            RelationValue::Many(_) => Ok(None),
        }
    }

    /// Reads the resolved members of a to-many relation, resolving it first.
    pub fn related_many(&self, name: &str) -> AccessResult<Vec<EntityRef>> {
        let index = self.relation_of_kind(name, true)?;
        self.ensure_resolved(index);
        match &self.state.read().relations[index].value {
            RelationValue::Many(many) => Ok(many.clone()),
            RelationValue::One(_) => Ok(Vec::new()),
        }
    }

    /// Points a to-one relation at `target`, or clears it.
    ///
    /// The counter field of the old and the new target is updated.
    pub fn set_related(&self, name: &str, target: Option<&EntityRef>) -> AccessResult<()> {
        let index = self.relation_of_kind(name, false)?;
        let counter = self.model.relations()[index].counter.as_deref();
        if let Some(target) = target {
            self.check_target(index, target)?;
        }
        self.ensure_resolved(index);
        if counter.is_some() {
            self.require_resolved(index)?;
        }
        if let (Some(target), Some(counter)) = (target, counter) {
            target.require_counter_free(counter, self)?;
        }
        let old = {
            let mut state = self.state.write();
            let slot = &mut state.relations[index];
            slot.pending = None;
            match std::mem::replace(&mut slot.value, RelationValue::One(target.cloned())) {
                RelationValue::One(old) => old,
                RelationValue::Many(_) => None,
            }
        };
        self.recompute_resolved();

        let unchanged = matches!((&old, target), (Some(o), Some(t)) if o.ptr_eq(t));
        if unchanged {
            return Ok(());
        }
        if let Some(counter) = counter {
            if let Some(old) = old {
                old.unlink_back(counter, self);
            }
            if let Some(target) = target {
                target.link_back(counter, self);
            }
        }
        Ok(())
    }

    /// Adds `target` to a to-many relation.
    pub fn add_related(&self, name: &str, target: &EntityRef) -> AccessResult<()> {
        let index = self.relation_of_kind(name, true)?;
        self.check_target(index, target)?;
        self.ensure_resolved(index);
        if let Some(counter) = self.model.relations()[index].counter.as_deref() {
            target.require_counter_free(counter, self)?;
        }
        let target_id = target.id();
        let added = {
            let mut state = self.state.write();
            let slot = &mut state.relations[index];
            let pending_has = target_id.is_assigned()
                && slot.pending.as_ref().is_some_and(|p| p.contains(&target_id));
            match &mut slot.value {
                RelationValue::Many(many) if !pending_has && !many.iter().any(|e| e.ptr_eq(target)) => {
                    many.push(target.clone());
                    true
                }
                _ => false,
            }
        };
        if added {
            if let Some(counter) = self.model.relations()[index].counter.as_deref() {
                target.link_back(counter, self);
            }
        }
        Ok(())
    }

    /// Removes `target` from a to-many relation.
    ///
    /// Returns true if it was a member.
    pub fn remove_related(&self, name: &str, target: &EntityRef) -> AccessResult<bool> {
        let index = self.relation_of_kind(name, true)?;
        self.ensure_resolved(index);
        let removed = self.detach_member(index, target);
        if removed {
            if let Some(counter) = self.model.relations()[index].counter.as_deref() {
                target.unlink_back(counter, self);
            }
        }
        Ok(removed)
    }

    /// Resolves the named relation, surfacing fetch errors.
    ///
    /// Returns `Ok(false)` if the fetch was refused by the fetch registry
    /// or no loader is attached.
    pub fn resolve(&self, name: &str) -> AccessResult<bool> {
        let index = self.model.relation_position(name)?;
        self.resolve_at(index)
    }

    /// Resolves every relation, surfacing the first fetch error.
    pub fn resolve_all(&self) -> AccessResult<bool> {
        let mut all = true;
        for index in 0..self.model.relations().len() {
            all &= self.resolve_at(index)?;
        }
        Ok(all)
    }

    /// Turns resolved relation members back into pending ids.
    ///
    /// Breaks reference cycles between cached entities so that a cleared
    /// cache actually frees them. Members without an assigned id are dropped.
    pub fn release_relations(&self) {
        let taken: Vec<RelationValue> = {
            let mut state = self.state.write();
            state
                .relations
                .iter_mut()
                .map(|slot| match &mut slot.value {
                    RelationValue::One(one) => RelationValue::One(one.take()),
                    RelationValue::Many(many) => RelationValue::Many(std::mem::take(many)),
                })
                .collect()
        };
        let released: Vec<Vec<EntityId>> = taken
            .into_iter()
            .map(|value| match value {
                RelationValue::One(one) => one.map(|e| e.id()).into_iter().collect(),
                RelationValue::Many(many) => many.iter().map(|e| e.id()).collect(),
            })
            .collect();
        {
            let mut state = self.state.write();
            for (slot, ids) in state.relations.iter_mut().zip(released) {
                let mut ids: Vec<EntityId> = ids.into_iter().filter(|id| id.is_assigned()).collect();
                ids.extend(slot.pending.take().unwrap_or_default());
                if !ids.is_empty() {
                    slot.pending = Some(ids);
                }
            }
        }
        self.recompute_resolved();
    }

    fn relation_of_kind(&self, name: &str, many: bool) -> AccessResult<usize> {
        let index = self.model.relation_position(name)?;
        if self.model.relations()[index].is_many() != many {
            let expected = if many { "to-many" } else { "to-one" };
            return Err(AccessError::invalid_operation(format!(
                "{}.{name} is not a {expected} relation",
                self.type_name()
            )));
        }
        Ok(index)
    }

    fn check_target(&self, index: usize, target: &EntityRef) -> AccessResult<()> {
        let relation = &self.model.relations()[index];
        if target.type_name() != relation.target {
            return Err(AccessError::invalid_value(
                &relation.name,
                format!("expected {}, got {}", relation.target, target.type_name()),
            ));
        }
        Ok(())
    }

    fn require_resolved(&self, index: usize) -> AccessResult<()> {
        if self.state.read().relations[index].pending.is_none() {
            return Ok(());
        }
        Err(AccessError::Unresolved {
            type_name: self.type_name().to_owned(),
            id: self.id(),
            field: self.model.relations()[index].name.clone(),
        })
    }

    /// Checks that linking `owner` into the named to-one slot will not drop
    /// an unresolved previous owner.
    fn require_counter_free(&self, name: &str, owner: &EntityRef) -> AccessResult<()> {
        let Some(index) = self.model.relation_index(name) else {
            return Ok(());
        };
        if self.model.relations()[index].is_many() {
            return Ok(());
        }
        self.ensure_resolved(index);
        let owner_id = owner.id();
        let foreign = self.state.read().relations[index]
            .pending
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| *id != owner_id));
        if foreign {
            self.require_resolved(index)
        } else {
            Ok(())
        }
    }

    /// Resolves a slot, logging fetch failures and leaving the slot pending.
    fn ensure_resolved(&self, index: usize) {
        if self.is_fully_resolved() {
            return;
        }
        if let Err(err) = self.resolve_at(index) {
            error!(
                entity = %self,
                relation = %self.model.relations()[index].name,
                error = %err,
                "relation fetch failed"
            );
        }
    }

    fn resolve_at(&self, index: usize) -> AccessResult<bool> {
        let requested = match &self.state.read().relations[index].pending {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => return Ok(true),
        };
        let Some(loader) = &self.loader else {
            return Ok(false);
        };
        let relation = &self.model.relations()[index];
        let key = FetchKey::new(self.type_name(), self.id(), index);
        let Some(_guard) = loader.fetches.try_begin(key) else {
            debug!(entity = %self, relation = %relation.name, "relation fetch skipped");
            return Ok(false);
        };

        let access = loader.access.get()?;
        let fetched = if relation.is_many() {
            access.get_many(&relation.target, &requested)?
        } else {
            vec![access.get_one(&relation.target, requested[0])?]
        };
        let bound = self.bind_fetched(index, &requested, fetched);
        self.recompute_resolved();

        if let Some(counter) = relation.counter.as_deref() {
            for related in &bound {
                related.link_back(counter, self);
            }
        }
        Ok(self.state.read().relations[index].pending.is_none())
    }

    /// Binds fetched entities into a slot and returns the newly bound ones.
    fn bind_fetched(
        &self,
        index: usize,
        requested: &[EntityId],
        fetched: Vec<EntityRef>,
    ) -> Vec<EntityRef> {
        let mut by_id: HashMap<EntityId, EntityRef> =
            fetched.into_iter().map(|e| (e.id(), e)).collect();
        let mut bound = Vec::new();
        let mut state = self.state.write();
        let slot = &mut state.relations[index];
        let Some(current) = slot.pending.take() else {
            return bound;
        };
        let mut unresolved = Vec::new();
        for id in current {
            match by_id.remove(&id) {
                Some(entity) => {
                    match &mut slot.value {
                        RelationValue::One(one) => *one = Some(entity.clone()),
                        RelationValue::Many(many) => {
                            if !many.iter().any(|e| e.ptr_eq(&entity)) {
                                many.push(entity.clone());
                            }
                        }
                    }
                    bound.push(entity);
                }
                None if requested.contains(&id) => {
                    warn!(
                        type_name = %self.model.name(),
                        relation = %self.model.relations()[index].name,
                        missing = %id,
                        "related entity no longer exists"
                    );
                }
                None => unresolved.push(id),
            }
        }
        if !unresolved.is_empty() {
            slot.pending = Some(unresolved);
        }
        bound
    }

    /// Adds `other` to the named slot without fetching.
    ///
    /// A to-one slot that pointed elsewhere releases its old target.
    fn link_back(&self, name: &str, other: &EntityRef) {
        let Some(index) = self.model.relation_index(name) else {
            warn!(type_name = %self.type_name(), relation = name, "unknown counter field");
            return;
        };
        let other_id = other.id();
        let displaced = {
            let mut state = self.state.write();
            let slot = &mut state.relations[index];
            match &mut slot.value {
                RelationValue::Many(many) => {
                    let pending_has = other_id.is_assigned()
                        && slot.pending.as_ref().is_some_and(|p| p.contains(&other_id));
                    if !pending_has && !many.iter().any(|e| e.ptr_eq(other)) {
                        many.push(other.clone());
                    }
                    None
                }
                RelationValue::One(one) => {
                    slot.pending = None;
                    one.replace(other.clone()).filter(|old| !old.ptr_eq(other))
                }
            }
        };
        self.recompute_resolved();
        if let Some(displaced) = displaced {
            if let Some(counter) = self.model.relations()[index].counter.as_deref() {
                displaced.unlink_back(counter, self);
            }
        }
    }

    /// Removes `other` from the named slot without fetching.
    fn unlink_back(&self, name: &str, other: &EntityRef) {
        let Some(index) = self.model.relation_index(name) else {
            warn!(type_name = %self.type_name(), relation = name, "unknown counter field");
            return;
        };
        self.detach_member(index, other);
        self.recompute_resolved();
    }

    fn detach_member(&self, index: usize, other: &EntityRef) -> bool {
        let other_id = other.id();
        let mut state = self.state.write();
        let slot = &mut state.relations[index];
        let mut removed = false;
        if other_id.is_assigned() {
            if let Some(pending) = &mut slot.pending {
                let before = pending.len();
                pending.retain(|id| *id != other_id);
                removed = pending.len() != before;
                if pending.is_empty() {
                    slot.pending = None;
                }
            }
        }
        match &mut slot.value {
            RelationValue::Many(many) => {
                let before = many.len();
                many.retain(|e| !e.ptr_eq(other));
                removed |= many.len() != before;
            }
            RelationValue::One(one) => {
                if one.as_ref().is_some_and(|e| e.ptr_eq(other)) {
                    *one = None;
                    removed = true;
                }
            }
        }
        removed
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id={}", self.type_name(), self.id())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Entity")
            .field("type", &self.model.name())
            .field("id", &state.id)
            .field("version", &state.version)
            .field("fields", &state.fields)
            .field("resolved", &self.is_fully_resolved())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeRegistry;
    use crate::testing::library;

    #[test]
    fn fields_are_validated_on_write() {
        let registry = library();
        let book = registry.new_instance("Book").unwrap();
        book.set_field("title", "Dune").unwrap();
        assert_eq!(book.field("title").unwrap(), Value::from("Dune"));
        assert!(book.set_field("pages", "many").is_err());
        assert!(matches!(
            book.set_field("isbn", 1),
            Err(AccessError::UnknownField { .. })
        ));
    }

    #[test]
    fn many_to_one_link_maintains_the_collection() {
        let registry = library();
        let author = registry.new_instance("Author").unwrap();
        let book = registry.new_instance("Book").unwrap();

        book.set_related("author", Some(&author)).unwrap();
        let books = author.related_many("books").unwrap();
        assert_eq!(books.len(), 1);
        assert!(books[0].ptr_eq(&book));

        book.set_related("author", None).unwrap();
        assert!(author.related_many("books").unwrap().is_empty());
    }

    #[test]
    fn moving_a_member_updates_both_owners() {
        let registry = library();
        let first = registry.new_instance("Author").unwrap();
        let second = registry.new_instance("Author").unwrap();
        let book = registry.new_instance("Book").unwrap();

        first.add_related("books", &book).unwrap();
        second.add_related("books", &book).unwrap();

        assert!(first.related_many("books").unwrap().is_empty());
        assert!(second.related_many("books").unwrap()[0].ptr_eq(&book));
        assert!(book.related_one("author").unwrap().unwrap().ptr_eq(&second));
    }

    #[test]
    fn many_to_many_keeps_both_sides() {
        let registry = library();
        let book = registry.new_instance("Book").unwrap();
        let tag = registry.new_instance("Tag").unwrap();

        book.add_related("tags", &tag).unwrap();
        book.add_related("tags", &tag).unwrap();
        assert_eq!(book.related_many("tags").unwrap().len(), 1);
        assert!(tag.related_many("books").unwrap()[0].ptr_eq(&book));

        assert!(tag.remove_related("books", &book).unwrap());
        assert!(book.related_many("tags").unwrap().is_empty());
    }

    #[test]
    fn wrong_relation_kind_or_target_is_rejected() {
        let registry = library();
        let book = registry.new_instance("Book").unwrap();
        let tag = registry.new_instance("Tag").unwrap();
        assert!(book.related_many("author").is_err());
        assert!(book.set_related("author", Some(&tag)).is_err());
    }

    #[test]
    fn release_turns_members_into_pending_ids() {
        let registry = library();
        let author = registry.new_instance("Author").unwrap();
        let book = registry.new_instance("Book").unwrap();
        author.set_id(EntityId::new(1));
        book.set_id(EntityId::new(10));
        author.add_related("books", &book).unwrap();

        author.release_relations();
        assert!(!author.is_fully_resolved());
        assert_eq!(author.relation_ids("books").unwrap(), vec![EntityId::new(10)]);
        assert!(!author.resolve("books").unwrap());
    }

    fn stand_in_book(registry: &TypeRegistry, id: i64, author: i64) -> EntityRef {
        let model = Arc::clone(registry.model("Book").unwrap());
        let fields = vec![Value::Null; model.fields().len()];
        let book = EntityRef::build(model, EntityId::new(id), None, None);
        book.prime(fields, vec![Some(vec![EntityId::new(author)]), None]);
        book
    }

    #[test]
    fn clearing_an_unresolved_owner_is_refused() {
        let registry = library();
        let book = stand_in_book(&registry, 10, 1);

        assert!(matches!(
            book.set_related("author", None),
            Err(AccessError::Unresolved { .. })
        ));
        assert_eq!(book.relation_ids("author").unwrap(), vec![EntityId::new(1)]);
    }

    #[test]
    fn adopting_a_member_with_an_unresolved_owner_is_refused() {
        let registry = library();
        let book = stand_in_book(&registry, 10, 1);
        let stranger = registry.new_instance("Author").unwrap();
        stranger.set_id(EntityId::new(2));

        assert!(matches!(
            stranger.add_related("books", &book),
            Err(AccessError::Unresolved { .. })
        ));
        assert!(stranger.related_many("books").unwrap().is_empty());
        assert_eq!(book.relation_ids("author").unwrap(), vec![EntityId::new(1)]);

        let owner = registry.new_instance("Author").unwrap();
        owner.set_id(EntityId::new(1));
        owner.add_related("books", &book).unwrap();
        assert!(book.related_one("author").unwrap().unwrap().ptr_eq(&owner));
    }

    #[test]
    fn display_names_type_and_id() {
        let registry = library();
        let tag = registry.new_instance("Tag").unwrap();
        tag.set_id(EntityId::new(4));
        assert_eq!(tag.to_string(), "Tag id=4");
    }
}
