//! Lazy sequence decorator.

use super::ModelController;
use crate::access::{AccessHandle, ControllerAccess, EntityAccess};
use crate::entity::EntityRef;
use crate::error::AccessResult;
use crate::model::{EntityId, VersionToken};
use crate::sequence::{EntityList, LazySequence};
use std::sync::{Arc, Weak};

/// Answers list reads with lazy sequences resolved through the wrapped
/// controller.
pub struct LazySequenceDecorator {
    inner: Arc<dyn ModelController>,
    access: Arc<dyn EntityAccess>,
    lazy_iterators: bool,
}

impl LazySequenceDecorator {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ModelController>) -> Self {
        let access: Arc<dyn EntityAccess> = Arc::new(ControllerAccess::new(Arc::clone(&inner)));
        Self {
            inner,
            access,
            lazy_iterators: false,
        }
    }

    /// Makes the produced sequences iterate lazily.
    #[must_use]
    pub fn with_lazy_iterators(mut self, lazy: bool) -> Self {
        self.lazy_iterators = lazy;
        self
    }

    fn sequence(&self, type_name: &str, ids: Vec<EntityId>) -> EntityList {
        EntityList::Lazy(
            LazySequence::new(type_name, ids, AccessHandle::from_arc(&self.access))
                .with_lazy_iterator(self.lazy_iterators),
        )
    }
}

impl ModelController for LazySequenceDecorator {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let ids = self.inner.get_ids(type_name)?;
        Ok(self.sequence(type_name, ids))
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        self.inner.get_ids(type_name)
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        self.inner.get_entity_count(type_name)
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.inner.get_entity_by_id(type_name, id)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        Ok(self.sequence(type_name, ids.to_vec()))
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        self.inner.create_new(type_name)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        self.inner.create_copy(entity)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        self.inner.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        self.inner.delete(entity)
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        self.inner.check_writable(entity)
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        self.inner.version_of(type_name, id)
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.inner.bind_entity_access(access);
    }

    fn close(&self) -> AccessResult<()> {
        self.inner.close()
    }
}
