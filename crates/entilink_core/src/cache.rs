//! Identity map.
//!
//! Holds at most one live instance per `(canonical type, id)`. Entries are
//! keyed by the canonical type of the registry, so aliases share one slot
//! space. The cache never touches entity fields and never fails: unknown
//! types and misses read as empty.

use crate::entity::EntityRef;
use crate::model::{EntityId, TypeRegistry};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::error;

/// Outcome of [`IdentityCache::put`].
#[derive(Debug, Clone)]
pub enum Registration {
    /// The entity is now the cached instance.
    Registered,
    /// Another instance already owns the identity and was kept.
    Rejected(EntityRef),
}

impl Registration {
    /// Returns true if the entity was stored.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// Per-type map from id to the single live instance.
#[derive(Debug)]
pub struct IdentityCache {
    registry: Arc<TypeRegistry>,
    entries: RwLock<HashMap<String, BTreeMap<EntityId, EntityRef>>>,
}

impl IdentityCache {
    /// Creates an empty cache.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The type registry used to canonicalize type names.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    fn key(&self, type_name: &str) -> Option<String> {
        self.registry.canonical_name(type_name).map(str::to_owned)
    }

    /// Number of cached instances of `type_name`.
    pub fn count(&self, type_name: &str) -> usize {
        self.key(type_name)
            .and_then(|k| self.entries.read().get(&k).map(BTreeMap::len))
            .unwrap_or(0)
    }

    /// Cached instances of `type_name` in id order.
    pub fn entities(&self, type_name: &str) -> Vec<EntityRef> {
        self.key(type_name)
            .and_then(|k| {
                self.entries
                    .read()
                    .get(&k)
                    .map(|m| m.values().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Cached ids of `type_name` in ascending order.
    pub fn ids(&self, type_name: &str) -> Vec<EntityId> {
        self.key(type_name)
            .and_then(|k| {
                self.entries
                    .read()
                    .get(&k)
                    .map(|m| m.keys().copied().collect())
            })
            .unwrap_or_default()
    }

    /// Returns true if some instance holds `(type_name, id)`.
    pub fn has(&self, type_name: &str, id: EntityId) -> bool {
        self.get(type_name, id).is_some()
    }

    /// Returns true if some instance holds the identity of `entity`.
    pub fn has_entity(&self, entity: &EntityRef) -> bool {
        self.has(entity.type_name(), entity.id())
    }

    /// Returns true if `entity` itself is the cached instance.
    pub fn has_exact(&self, entity: &EntityRef) -> bool {
        self.get(entity.type_name(), entity.id())
            .is_some_and(|cached| cached.ptr_eq(entity))
    }

    /// Returns the cached instance for `(type_name, id)`.
    pub fn get(&self, type_name: &str, id: EntityId) -> Option<EntityRef> {
        let key = self.key(type_name)?;
        self.entries.read().get(&key)?.get(&id).cloned()
    }

    /// Registers `entity` unless its identity is already taken.
    ///
    /// A second instance for a taken identity is rejected and logged; the
    /// first instance stays cached.
    pub fn put(&self, entity: &EntityRef) -> Registration {
        let Some(key) = self.key(entity.type_name()) else {
            error!(entity = %entity, "cannot cache entity of unregistered type");
            return Registration::Rejected(entity.clone());
        };
        let id = entity.id();
        let mut entries = self.entries.write();
        let slots = entries.entry(key).or_default();
        match slots.get(&id) {
            Some(existing) if existing.ptr_eq(entity) => Registration::Registered,
            Some(existing) => {
                error!(entity = %entity, "identity already cached, keeping the cached instance");
                Registration::Rejected(existing.clone())
            }
            None => {
                slots.insert(id, entity.clone());
                Registration::Registered
            }
        }
    }

    /// Removes and returns the instance for `(type_name, id)`.
    pub fn remove(&self, type_name: &str, id: EntityId) -> Option<EntityRef> {
        let key = self.key(type_name)?;
        self.entries.write().get_mut(&key)?.remove(&id)
    }

    /// Removes `entity`'s identity if `entity` is the cached instance.
    pub fn remove_entity(&self, entity: &EntityRef) -> bool {
        let Some(key) = self.key(entity.type_name()) else {
            return false;
        };
        let id = entity.id();
        let mut entries = self.entries.write();
        let Some(slots) = entries.get_mut(&key) else {
            return false;
        };
        if slots.get(&id).is_some_and(|cached| cached.ptr_eq(entity)) {
            slots.remove(&id);
            true
        } else {
            false
        }
    }

    /// Removes every instance of `type_name`, returning them.
    pub fn clear_type(&self, type_name: &str) -> Vec<EntityRef> {
        self.key(type_name)
            .and_then(|k| self.entries.write().remove(&k))
            .map(|m| m.into_values().collect())
            .unwrap_or_default()
    }

    /// Removes every instance, returning them.
    pub fn clear(&self) -> Vec<EntityRef> {
        std::mem::take(&mut *self.entries.write())
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect()
    }

    /// Every cached instance, grouped by type.
    pub fn all(&self) -> Vec<EntityRef> {
        self.entries
            .read()
            .values()
            .flat_map(|m| m.values().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::library;

    fn book(registry: &TypeRegistry, id: i64) -> EntityRef {
        let book = registry.new_instance("Book").unwrap();
        book.set_id(EntityId::new(id));
        book
    }

    #[test]
    fn second_instance_for_an_identity_is_rejected() {
        let registry = library();
        let cache = IdentityCache::new(Arc::clone(&registry));
        let first = book(&registry, 1);
        let second = book(&registry, 1);

        assert!(cache.put(&first).is_registered());
        match cache.put(&second) {
            Registration::Rejected(kept) => assert!(kept.ptr_eq(&first)),
            Registration::Registered => panic!("duplicate registered"),
        }
        assert!(cache.get("Book", EntityId::new(1)).unwrap().ptr_eq(&first));
        assert!(cache.put(&first).is_registered());
        assert_eq!(cache.count("Book"), 1);
    }

    #[test]
    fn exact_check_uses_reference_identity() {
        let registry = library();
        let cache = IdentityCache::new(Arc::clone(&registry));
        let cached = book(&registry, 4);
        let copy = book(&registry, 4);
        cache.put(&cached);

        assert!(cache.has_entity(&copy));
        assert!(!cache.has_exact(&copy));
        assert!(cache.has_exact(&cached));
        assert!(!cache.remove_entity(&copy));
        assert!(cache.remove_entity(&cached));
        assert!(!cache.has("Book", EntityId::new(4)));
    }

    #[test]
    fn aliases_share_the_canonical_slot() {
        let registry = library();
        let cache = IdentityCache::new(Arc::clone(&registry));
        cache.put(&book(&registry, 3));
        assert!(cache.has("BookImpl", EntityId::new(3)));
        assert_eq!(cache.ids("bookdto"), vec![EntityId::new(3)]);
    }

    #[test]
    fn misses_and_unknown_types_read_as_empty() {
        let registry = library();
        let cache = IdentityCache::new(registry);
        assert_eq!(cache.count("Shelf"), 0);
        assert!(cache.entities("Book").is_empty());
        assert!(cache.get("Book", EntityId::new(9)).is_none());
        assert!(cache.remove("Shelf", EntityId::new(1)).is_none());
    }

    #[test]
    fn entities_come_back_in_id_order() {
        let registry = library();
        let cache = IdentityCache::new(Arc::clone(&registry));
        for id in [5, 1, 3] {
            cache.put(&book(&registry, id));
        }
        assert_eq!(
            cache.ids("Book"),
            vec![EntityId::new(1), EntityId::new(3), EntityId::new(5)]
        );
        assert_eq!(cache.clear().len(), 3);
        assert_eq!(cache.count("Book"), 0);
    }
}
