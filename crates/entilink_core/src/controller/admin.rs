//! Cache administration: dump, reload and clear.

use super::CacheController;
use crate::access::EntityAccess;
use crate::cache::Registration;
use crate::error::AccessResult;
use crate::fetch::FetchRegistry;
use crate::standin::LazyContext;
use crate::transfer::TransferObject;
use std::io::{Read, Write};
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// Administrative handle on a pipeline's cache.
pub struct CacheAdmin {
    cache: Arc<CacheController>,
}

impl CacheAdmin {
    /// Wraps a cache decorator.
    pub fn new(cache: Arc<CacheController>) -> Self {
        Self { cache }
    }

    /// Number of cached instances per type, in registry order.
    pub fn summary(&self) -> Vec<(String, usize)> {
        let cache = self.cache.cache();
        cache
            .registry()
            .models()
            .map(|m| (m.name().to_owned(), cache.count(m.name())))
            .collect()
    }

    /// Writes every cached entity as a JSON array of transfer objects.
    ///
    /// Returns the number of entities written.
    pub fn write<W: Write>(&self, writer: W) -> AccessResult<usize> {
        let transfers: Vec<TransferObject> = self
            .cache
            .cache()
            .all()
            .iter()
            .map(|e| TransferObject::from_entity(e))
            .collect();
        serde_json::to_writer_pretty(writer, &transfers)?;
        info!(entities = transfers.len(), "cache dump written");
        Ok(transfers.len())
    }

    /// Reads a dump produced by [`CacheAdmin::write`] into the cache.
    ///
    /// The loaded entities resolve their relations through the cache.
    /// Identities that are already cached keep their cached instance.
    /// Returns the number of entities registered.
    pub fn read<R: Read>(&self, reader: R) -> AccessResult<usize> {
        let transfers: Vec<TransferObject> = serde_json::from_reader(reader)?;
        let weak = Arc::downgrade(&self.cache);
        let access: Weak<dyn EntityAccess> = weak;
        let context = LazyContext::new(
            Arc::clone(self.cache.cache().registry()),
            access,
            Arc::new(FetchRegistry::default()),
        );
        let mut registered = 0;
        for transfer in &transfers {
            let entity = context.materialize(transfer)?;
            match self.cache.cache().put(&entity) {
                Registration::Registered => registered += 1,
                Registration::Rejected(_) => {
                    warn!(entity = %entity, "dump entry collides with a cached entity")
                }
            }
        }
        info!(registered, total = transfers.len(), "cache dump loaded");
        Ok(registered)
    }

    /// Empties the cache and forgets which types were fully loaded.
    ///
    /// Relations of the evicted entities are released so that the object
    /// graph can be freed. Returns the number of evicted entities.
    pub fn clear(&self) -> usize {
        let evicted = self.cache.reset();
        for entity in &evicted {
            entity.release_relations();
        }
        info!(evicted = evicted.len(), "cache cleared");
        evicted.len()
    }
}
