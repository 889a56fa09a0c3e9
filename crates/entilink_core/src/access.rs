//! Entity-access capability used by lazy relations and lazy sequences.

use crate::controller::ModelController;
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use crate::model::EntityId;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Minimal fetch interface needed to resolve deferred relations.
pub trait EntityAccess: Send + Sync {
    /// Fetches one entity by id.
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef>;

    /// Fetches several entities by id.
    ///
    /// Ids without a backing row are omitted from the result.
    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>>;
}

/// Adapts any controller into an [`EntityAccess`].
pub struct ControllerAccess {
    controller: Arc<dyn ModelController>,
}

impl ControllerAccess {
    /// Wraps `controller`.
    pub fn new(controller: Arc<dyn ModelController>) -> Self {
        Self { controller }
    }
}

impl EntityAccess for ControllerAccess {
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.controller.get_entity_by_id(type_name, id)
    }

    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        self.controller
            .get_entities_by_ids(type_name, ids)?
            .into_vec()
    }
}

/// Weak handle to an [`EntityAccess`].
///
/// Entities hold their access through this handle so that an entity graph
/// never keeps its pipeline alive.
#[derive(Clone)]
pub struct AccessHandle(Weak<dyn EntityAccess>);

impl AccessHandle {
    /// Wraps a weak reference.
    pub fn new(access: Weak<dyn EntityAccess>) -> Self {
        Self(access)
    }

    /// Downgrades a strong reference.
    pub fn from_arc(access: &Arc<dyn EntityAccess>) -> Self {
        Self(Arc::downgrade(access))
    }

    /// Returns the access, failing with `Detached` once it has been dropped.
    pub fn get(&self) -> AccessResult<Arc<dyn EntityAccess>> {
        self.0.upgrade().ok_or(AccessError::Detached)
    }
}

impl std::fmt::Debug for AccessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessHandle")
            .field("live", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// The access a backend hands to the stand-ins it creates.
///
/// Starts out as the backend itself and is rebound to the cache decorator
/// when a pipeline is assembled.
#[derive(Debug)]
pub struct AccessBinding {
    bound: RwLock<Option<AccessHandle>>,
    fallback: AccessHandle,
}

impl AccessBinding {
    /// Creates a binding that answers with `fallback` until rebound.
    pub fn new(fallback: AccessHandle) -> Self {
        Self {
            bound: RwLock::new(None),
            fallback,
        }
    }

    /// Rebinds to `access`.
    pub fn bind(&self, access: AccessHandle) {
        *self.bound.write() = Some(access);
    }

    /// Returns the current access handle.
    pub fn current(&self) -> AccessHandle {
        self.bound
            .read()
            .clone()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
