//! Consistency decorator.

use super::ModelController;
use crate::access::EntityAccess;
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use crate::model::{EntityId, VersionToken};
use crate::sequence::EntityList;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Validates ids, enforces optimistic concurrency and severs relations
/// before delete.
pub struct ConsistencyDecorator {
    inner: Arc<dyn ModelController>,
}

impl ConsistencyDecorator {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ModelController>) -> Self {
        Self { inner }
    }

    fn check_id(type_name: &str, id: EntityId) -> AccessResult<()> {
        if id.is_assigned() {
            Ok(())
        } else {
            warn!(type_name, %id, "rejected malicious id");
            Err(AccessError::malicious_id(type_name, id))
        }
    }

    fn check_version(&self, entity: &EntityRef) -> AccessResult<()> {
        if !entity.model().is_versioned() {
            return Ok(());
        }
        let local = entity.version();
        let stored = self.inner.version_of(entity.type_name(), entity.id())?;
        if local == stored {
            return Ok(());
        }
        warn!(entity = %entity, ?local, ?stored, "version token mismatch");
        Err(AccessError::OutOfSync {
            type_name: entity.type_name().to_owned(),
            id: entity.id(),
            local: local.map(VersionToken::raw),
            stored: stored.map(VersionToken::raw),
        })
    }

    /// Detaches `entity` from everything it relates to.
    ///
    /// Returns the counterparts whose relations changed.
    /// Every relation is resolved before the first one is touched.
    fn sever(entity: &EntityRef) -> AccessResult<Vec<EntityRef>> {
        let model = Arc::clone(entity.model());
        for relation in model.relations() {
            if !entity.resolve(&relation.name)? {
                return Err(AccessError::Unresolved {
                    type_name: model.name().to_owned(),
                    id: entity.id(),
                    field: relation.name.clone(),
                });
            }
        }
        let mut touched: Vec<EntityRef> = Vec::new();
        for relation in model.relations() {
            let related = if relation.is_many() {
                let members = entity.related_many(&relation.name)?;
                for member in &members {
                    entity.remove_related(&relation.name, member)?;
                }
                members
            } else {
                let target = entity.related_one(&relation.name)?;
                entity.set_related(&relation.name, None)?;
                target.into_iter().collect()
            };
            if relation.counter.is_some() {
                for counterpart in related {
                    if !counterpart.ptr_eq(entity) && !touched.iter().any(|t| t.ptr_eq(&counterpart)) {
                        touched.push(counterpart);
                    }
                }
            }
        }
        Ok(touched)
    }
}

impl ModelController for ConsistencyDecorator {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        self.inner.get_entities(type_name)
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        self.inner.get_ids(type_name)
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        self.inner.get_entity_count(type_name)
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        Self::check_id(type_name, id)?;
        self.inner.get_entity_by_id(type_name, id)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        for &id in ids {
            Self::check_id(type_name, id)?;
        }
        self.inner.get_entities_by_ids(type_name, ids)
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        self.inner.create_new(type_name)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        self.inner.create_copy(entity)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        for entity in entities {
            Self::check_id(entity.type_name(), entity.id())?;
            self.check_version(entity)?;
        }
        self.inner.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        Self::check_id(entity.type_name(), entity.id())?;
        self.inner.check_writable(entity)?;
        let touched = Self::sever(entity)?;
        self.inner.delete(entity)?;
        let persisted: Vec<EntityRef> = touched
            .into_iter()
            .filter(|e| e.id().is_assigned())
            .collect();
        if !persisted.is_empty() {
            debug!(entity = %entity, counterparts = persisted.len(), "persisting severed relations");
            self.inner.update(&persisted)?;
        }
        Ok(())
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        Self::check_id(entity.type_name(), entity.id())?;
        self.inner.check_writable(entity)
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        Self::check_id(type_name, id)?;
        self.inner.version_of(type_name, id)
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.inner.bind_entity_access(access);
    }

    fn close(&self) -> AccessResult<()> {
        self.inner.close()
    }
}
