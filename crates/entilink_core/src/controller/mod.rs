//! Controller contract and its decorators.
//!
//! A pipeline is a backend controller wrapped by decorators, each of which
//! implements the same [`ModelController`] trait:
//!
//! ```text
//! Consistency -> Synchronizing -> LazySequences -> Cache -> Backend
//! ```
//!
//! Use [`ControllerBuilder`] to assemble one.

mod admin;
mod builder;
mod cache;
mod consistency;
mod lazy;
mod synchronizing;

pub use admin::CacheAdmin;
pub use builder::{ControllerBuilder, Pipeline};
pub use cache::CacheController;
pub use consistency::ConsistencyDecorator;
pub use lazy::LazySequenceDecorator;
pub use synchronizing::SynchronizingDecorator;

use crate::access::EntityAccess;
use crate::entity::EntityRef;
use crate::error::AccessResult;
use crate::model::{EntityId, VersionToken};
use crate::sequence::EntityList;
use std::sync::Weak;

/// Uniform CRUD surface shared by backends and decorators.
pub trait ModelController: Send + Sync {
    /// All entities of a type.
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList>;

    /// All ids of a type.
    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>>;

    /// Number of entities of a type.
    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize>;

    /// One entity by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the backend holds no such entity.
    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef>;

    /// Several entities by id, in input order. Missing ids are omitted.
    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList>;

    /// Creates and persists a blank entity.
    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef>;

    /// Creates and persists a copy of `entity` with a new id.
    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef>;

    /// Persists the current state of `entities`.
    fn update(&self, entities: &[EntityRef]) -> AccessResult<()>;

    /// Deletes `entity`.
    fn delete(&self, entity: &EntityRef) -> AccessResult<()>;

    /// Checks that `entity` may be written through this controller.
    ///
    /// Decorators that mutate state before delegating a write ask this
    /// first. The cache decorator requires the exact cached instance.
    fn check_writable(&self, _entity: &EntityRef) -> AccessResult<()> {
        Ok(())
    }

    /// The persisted version token of `(type_name, id)`.
    ///
    /// Decorators pass this straight to the backend so that the answer is
    /// never served from memory.
    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>>;

    /// Installs the access that stand-ins created by the backend use to
    /// resolve their relations. Decorators forward it inward.
    fn bind_entity_access(&self, _access: Weak<dyn EntityAccess>) {}

    /// Releases the backend.
    fn close(&self) -> AccessResult<()>;
}
