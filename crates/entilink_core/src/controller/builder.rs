//! Pipeline assembly.

use super::{
    CacheAdmin, CacheController, ConsistencyDecorator, LazySequenceDecorator, ModelController,
    SynchronizingDecorator,
};
use crate::access::EntityAccess;
use crate::cache::IdentityCache;
use crate::config::Config;
use crate::entity::EntityRef;
use crate::error::AccessResult;
use crate::model::{EntityId, TypeRegistry, VersionToken};
use crate::sequence::EntityList;
use std::sync::{Arc, Weak};
use tracing::info;

/// Assembles a backend and decorators into a [`Pipeline`].
///
/// The order of the `with_*` calls does not matter; [`ControllerBuilder::build`]
/// always composes
/// `Consistency -> Synchronizing -> LazySequences -> Cache -> Backend`.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = ControllerBuilder::new(backend, registry)
///     .with_cache()
///     .with_synchronizer()
///     .with_consistency_check()
///     .build();
/// let book = pipeline.get_entity_by_id("Book", EntityId::new(1))?;
/// ```
pub struct ControllerBuilder {
    backend: Arc<dyn ModelController>,
    registry: Arc<TypeRegistry>,
    cache: bool,
    lazy_sequences: bool,
    lazy_iterators: bool,
    synchronize: bool,
    consistency_check: bool,
}

impl ControllerBuilder {
    /// Starts a pipeline over `backend` with no decorators.
    pub fn new(backend: Arc<dyn ModelController>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            backend,
            registry,
            cache: false,
            lazy_sequences: false,
            lazy_iterators: false,
            synchronize: false,
            consistency_check: false,
        }
    }

    /// Starts a pipeline with the decorators enabled in `config`.
    pub fn from_config(
        backend: Arc<dyn ModelController>,
        registry: Arc<TypeRegistry>,
        config: &Config,
    ) -> Self {
        let mut builder = Self::new(backend, registry);
        builder.cache = config.cache;
        builder.lazy_sequences = config.lazy_sequences;
        builder.lazy_iterators = config.lazy_iterators;
        builder.synchronize = config.synchronize;
        builder.consistency_check = config.consistency_check;
        builder
    }

    /// Adds the cache decorator and makes it the backend's entity access.
    #[must_use]
    pub fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Answers list reads with lazy sequences.
    #[must_use]
    pub fn with_lazy_sequences(mut self, lazy_iterators: bool) -> Self {
        self.lazy_sequences = true;
        self.lazy_iterators = lazy_iterators;
        self
    }

    /// Adds the synchronizing decorator.
    #[must_use]
    pub fn with_synchronizer(mut self) -> Self {
        self.synchronize = true;
        self
    }

    /// Adds the consistency decorator.
    #[must_use]
    pub fn with_consistency_check(mut self) -> Self {
        self.consistency_check = true;
        self
    }

    /// Composes the pipeline.
    pub fn build(self) -> Pipeline {
        let mut controller = Arc::clone(&self.backend);
        let mut cache_controller = None;

        if self.cache {
            let cache = Arc::new(IdentityCache::new(Arc::clone(&self.registry)));
            let decorator = Arc::new(CacheController::new(controller, cache));
            let weak = Arc::downgrade(&decorator);
            let access: Weak<dyn EntityAccess> = weak;
            self.backend.bind_entity_access(access);
            cache_controller = Some(Arc::clone(&decorator));
            controller = decorator;
        }
        if self.lazy_sequences {
            controller = Arc::new(
                LazySequenceDecorator::new(controller).with_lazy_iterators(self.lazy_iterators),
            );
        }
        if self.synchronize {
            controller = Arc::new(SynchronizingDecorator::new(controller));
        }
        if self.consistency_check {
            controller = Arc::new(ConsistencyDecorator::new(controller));
        }

        info!(
            cache = self.cache,
            lazy_sequences = self.lazy_sequences,
            synchronize = self.synchronize,
            consistency_check = self.consistency_check,
            "controller pipeline assembled"
        );
        Pipeline {
            controller,
            cache: cache_controller,
        }
    }
}

/// An assembled controller pipeline.
#[derive(Clone)]
pub struct Pipeline {
    controller: Arc<dyn ModelController>,
    cache: Option<Arc<CacheController>>,
}

impl Pipeline {
    /// The outermost controller.
    pub fn controller(&self) -> &Arc<dyn ModelController> {
        &self.controller
    }

    /// The cache decorator, if the pipeline has one.
    pub fn cache_controller(&self) -> Option<&Arc<CacheController>> {
        self.cache.as_ref()
    }

    /// Administrative access to the cache, if the pipeline has one.
    pub fn cache_admin(&self) -> Option<CacheAdmin> {
        self.cache.as_ref().map(|c| CacheAdmin::new(Arc::clone(c)))
    }
}

impl ModelController for Pipeline {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        self.controller.get_entities(type_name)
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        self.controller.get_ids(type_name)
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        self.controller.get_entity_count(type_name)
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.controller.get_entity_by_id(type_name, id)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        self.controller.get_entities_by_ids(type_name, ids)
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        self.controller.create_new(type_name)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        self.controller.create_copy(entity)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        self.controller.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        self.controller.delete(entity)
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        self.controller.check_writable(entity)
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        self.controller.version_of(type_name, id)
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.controller.bind_entity_access(access);
    }

    fn close(&self) -> AccessResult<()> {
        self.controller.close()
    }
}
