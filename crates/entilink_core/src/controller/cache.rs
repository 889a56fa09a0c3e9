//! Cache decorator.

use super::ModelController;
use crate::access::EntityAccess;
use crate::cache::{IdentityCache, Registration};
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use crate::model::{EntityId, VersionToken};
use crate::sequence::EntityList;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Serves reads from the identity cache and guards writes with it.
///
/// Reads consult the cache first and call through only on a miss or for a
/// type that has not been fully loaded yet. Writes require the exact
/// cached instance; anything else fails with `UncachedEntity`.
pub struct CacheController {
    inner: Arc<dyn ModelController>,
    cache: Arc<IdentityCache>,
    fetched_types: RwLock<HashSet<String>>,
}

impl CacheController {
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: Arc<dyn ModelController>, cache: Arc<IdentityCache>) -> Self {
        Self {
            inner,
            cache,
            fetched_types: RwLock::new(HashSet::new()),
        }
    }

    /// The identity cache.
    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    fn canonical(&self, type_name: &str) -> AccessResult<String> {
        Ok(self.cache.registry().require(type_name)?.name().to_owned())
    }

    /// Returns true once every entity of the type is mirrored in the cache.
    pub fn is_fetched(&self, type_name: &str) -> bool {
        self.cache
            .registry()
            .canonical_name(type_name)
            .is_some_and(|name| self.fetched_types.read().contains(name))
    }

    /// Drops the cached instances of a type and forgets that it was loaded.
    pub fn invalidate(&self, type_name: &str) -> Vec<EntityRef> {
        if let Some(name) = self.cache.registry().canonical_name(type_name) {
            self.fetched_types.write().remove(name);
        }
        self.cache.clear_type(type_name)
    }

    /// Drops every cached instance and every fetched mark.
    pub fn reset(&self) -> Vec<EntityRef> {
        self.fetched_types.write().clear();
        self.cache.clear()
    }

    /// Registers a backend result; on collision the cached instance wins.
    fn adopt(&self, entity: EntityRef) -> EntityRef {
        match self.cache.put(&entity) {
            Registration::Registered => entity,
            Registration::Rejected(existing) => existing,
        }
    }

    fn register_created(&self, entity: EntityRef) -> AccessResult<EntityRef> {
        match self.cache.put(&entity) {
            Registration::Registered => Ok(entity),
            Registration::Rejected(_) => {
                error!(entity = %entity, "backend created an entity whose id is already cached");
                Err(AccessError::DuplicateId {
                    type_name: entity.type_name().to_owned(),
                    id: entity.id(),
                })
            }
        }
    }

    fn require_exact(&self, entity: &EntityRef) -> AccessResult<()> {
        if self.cache.has_exact(entity) {
            Ok(())
        } else {
            Err(AccessError::uncached(entity.type_name(), entity.id()))
        }
    }

    fn fetch_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        let mut found: HashMap<EntityId, EntityRef> = HashMap::new();
        let mut missing = Vec::new();
        for &id in ids {
            match self.cache.get(type_name, id) {
                Some(entity) => {
                    found.insert(id, entity);
                }
                None if !missing.contains(&id) => missing.push(id),
                None => {}
            }
        }
        if !missing.is_empty() {
            debug!(type_name, missing = missing.len(), "fetching uncached entities");
            for entity in self.inner.get_entities_by_ids(type_name, &missing)?.into_vec()? {
                let entity = self.adopt(entity);
                found.insert(entity.id(), entity);
            }
        }
        Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
    }
}

impl ModelController for CacheController {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let canonical = self.canonical(type_name)?;
        if !self.fetched_types.read().contains(&canonical) {
            match self.inner.get_entities(&canonical)? {
                EntityList::Lazy(sequence) => return Ok(EntityList::Lazy(sequence)),
                EntityList::Loaded(list) => {
                    for entity in list {
                        self.adopt(entity);
                    }
                    self.fetched_types.write().insert(canonical.clone());
                    debug!(type_name = %canonical, "type fully cached");
                }
            }
        }
        Ok(EntityList::Loaded(self.cache.entities(&canonical)))
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        if self.is_fetched(type_name) {
            Ok(self.cache.ids(type_name))
        } else {
            self.inner.get_ids(type_name)
        }
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        if self.is_fetched(type_name) {
            Ok(self.cache.count(type_name))
        } else {
            self.inner.get_entity_count(type_name)
        }
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        if let Some(entity) = self.cache.get(type_name, id) {
            return Ok(entity);
        }
        let fetched = self.inner.get_entity_by_id(type_name, id)?;
        Ok(self.adopt(fetched))
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        Ok(EntityList::Loaded(self.fetch_by_ids(type_name, ids)?))
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        let created = self.inner.create_new(type_name)?;
        self.register_created(created)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        let created = self.inner.create_copy(entity)?;
        self.register_created(created)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        for entity in entities {
            self.require_exact(entity)?;
        }
        self.inner.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        self.require_exact(entity)?;
        self.inner.delete(entity)?;
        self.cache.remove_entity(entity);
        Ok(())
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        self.require_exact(entity)?;
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

impl EntityAccess for CacheController {
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.get_entity_by_id(type_name, id)
    }

    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        self.fetch_by_ids(type_name, ids)
    }
}
