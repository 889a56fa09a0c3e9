//! Bounded relation-fetch fan-out.
//!
//! Resolving a relation may materialize new entities whose own relations
//! could trigger further fetches. The [`FetchRegistry`] caps that cascade:
//! a fetch is refused when the same `(type, id, field)` is already in
//! flight, or when the current thread is already nested `depth_limit`
//! fetches deep. Refused fetches are skipped, never queued.

use crate::model::EntityId;
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

/// Default nesting limit: a relation fetch never triggers another.
pub const DEFAULT_FETCH_DEPTH: usize = 1;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Identifies one relation slot of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    type_name: String,
    id: EntityId,
    field: usize,
}

impl FetchKey {
    /// Creates a key for relation `field` of `(type_name, id)`.
    pub fn new(type_name: impl Into<String>, id: EntityId, field: usize) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            field,
        }
    }
}

/// Registry of relation fetches currently in flight.
#[derive(Debug)]
pub struct FetchRegistry {
    in_flight: Mutex<HashSet<FetchKey>>,
    depth_limit: usize,
}

impl Default for FetchRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_DEPTH)
    }
}

impl FetchRegistry {
    /// Creates a registry allowing `depth_limit` nested fetches per thread.
    ///
    /// A limit of zero disables lazy resolution entirely.
    pub fn new(depth_limit: usize) -> Self {
        Self {
            in_flight: Mutex::new(HashSet::new()),
            depth_limit,
        }
    }

    /// Returns the configured nesting limit.
    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Number of fetches currently in flight across all threads.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Claims `key` for the calling thread.
    ///
    /// Returns `None` if the key is busy or the nesting limit is reached.
    /// The claim is released when the guard drops.
    pub fn try_begin(self: &Arc<Self>, key: FetchKey) -> Option<FetchGuard> {
        if current_depth() >= self.depth_limit {
            return None;
        }
        if !self.in_flight.lock().insert(key.clone()) {
            return None;
        }
        DEPTH.with(|d| d.set(d.get() + 1));
        Some(FetchGuard {
            registry: Arc::clone(self),
            key,
        })
    }
}

/// Nesting depth of relation fetches on the current thread.
pub fn current_depth() -> usize {
    DEPTH.with(Cell::get)
}

/// Claim on an in-flight fetch.
#[derive(Debug)]
pub struct FetchGuard {
    registry: Arc<FetchRegistry>,
    key: FetchKey,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.registry.in_flight.lock().remove(&self.key);
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, field: usize) -> FetchKey {
        FetchKey::new("Book", EntityId::new(id), field)
    }

    #[test]
    fn default_limit_refuses_nested_fetches() {
        let registry = Arc::new(FetchRegistry::default());
        let outer = registry.try_begin(key(1, 0)).unwrap();
        assert_eq!(current_depth(), 1);
        assert!(registry.try_begin(key(2, 0)).is_none());
        drop(outer);
        assert_eq!(current_depth(), 0);
        assert!(registry.try_begin(key(2, 0)).is_some());
    }

    #[test]
    fn deeper_limit_allows_distinct_keys_but_not_the_same_key() {
        let registry = Arc::new(FetchRegistry::new(3));
        let _a = registry.try_begin(key(1, 0)).unwrap();
        assert!(registry.try_begin(key(1, 0)).is_none());
        let _b = registry.try_begin(key(1, 1)).unwrap();
        assert_eq!(registry.in_flight(), 2);
    }

    #[test]
    fn zero_limit_disables_fetching() {
        let registry = Arc::new(FetchRegistry::new(0));
        assert!(registry.try_begin(key(1, 0)).is_none());
    }

    #[test]
    fn busy_key_on_another_thread_is_skipped() {
        let registry = Arc::new(FetchRegistry::new(4));
        let _held = registry.try_begin(key(9, 2)).unwrap();
        let other = Arc::clone(&registry);
        let refused = std::thread::spawn(move || other.try_begin(key(9, 2)).is_none())
            .join()
            .unwrap();
        assert!(refused);
    }
}
