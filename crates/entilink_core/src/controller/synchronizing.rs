//! Synchronizing decorator.

use super::ModelController;
use crate::access::EntityAccess;
use crate::entity::EntityRef;
use crate::error::AccessResult;
use crate::model::{EntityId, VersionToken};
use crate::sequence::EntityList;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Serializes every call to the wrapped controller behind one lock.
///
/// Relation fetches issued by stand-ins go to the cache directly and do
/// not take this lock.
pub struct SynchronizingDecorator {
    inner: Arc<dyn ModelController>,
    lock: Mutex<()>,
}

impl SynchronizingDecorator {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ModelController>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl ModelController for SynchronizingDecorator {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let _guard = self.lock.lock();
        self.inner.get_entities(type_name)
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        let _guard = self.lock.lock();
        self.inner.get_ids(type_name)
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        let _guard = self.lock.lock();
        self.inner.get_entity_count(type_name)
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        let _guard = self.lock.lock();
        self.inner.get_entity_by_id(type_name, id)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        let _guard = self.lock.lock();
        self.inner.get_entities_by_ids(type_name, ids)
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        let _guard = self.lock.lock();
        self.inner.create_new(type_name)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        let _guard = self.lock.lock();
        self.inner.create_copy(entity)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        let _guard = self.lock.lock();
        self.inner.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        let _guard = self.lock.lock();
        self.inner.delete(entity)
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        let _guard = self.lock.lock();
        self.inner.check_writable(entity)
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        let _guard = self.lock.lock();
        self.inner.version_of(type_name, id)
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        let _guard = self.lock.lock();
        self.inner.bind_entity_access(access);
    }

    fn close(&self) -> AccessResult<()> {
        let _guard = self.lock.lock();
        self.inner.close()
    }
}
