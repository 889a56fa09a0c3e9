//! Recording test doubles.
//!
//! [`RecordingAccess`] serves entities from an in-memory row map and logs
//! every fetch, which lets tests assert exactly when and how relations and
//! lazy sequences hit their source. [`RecordingController`] logs the calls
//! that reach a wrapped controller and how many of them overlapped.

use entilink_core::{
    AccessHandle, AccessResult, EntityAccess, EntityId, EntityList, EntityRef, FetchRegistry,
    LazyContext, ModelController, TransferObject, TypeRegistry, VersionToken, DEFAULT_FETCH_DEPTH,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// One fetch observed by [`RecordingAccess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCall {
    /// `get_one(type, id)`.
    One(String, EntityId),
    /// `get_many(type, ids)`.
    Many(String, Vec<EntityId>),
}

/// Entity access backed by a row map that records every call.
///
/// Each fetch materializes fresh stand-ins whose own relations load
/// through this access again.
pub struct RecordingAccess {
    context: LazyContext,
    rows: RwLock<HashMap<(String, EntityId), TransferObject>>,
    calls: Mutex<Vec<AccessCall>>,
}

impl RecordingAccess {
    /// Creates an empty access with the default fetch depth.
    pub fn new(registry: Arc<TypeRegistry>) -> Arc<Self> {
        Self::with_fetch_limit(registry, DEFAULT_FETCH_DEPTH)
    }

    /// Creates an empty access whose stand-ins nest fetches at most `limit` deep.
    pub fn with_fetch_limit(registry: Arc<TypeRegistry>, limit: usize) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let access: Weak<dyn EntityAccess> = weak.clone();
            Self {
                context: LazyContext::new(registry, access, Arc::new(FetchRegistry::new(limit))),
                rows: RwLock::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        })
    }

    /// Adds or replaces a row.
    pub fn insert(&self, row: TransferObject) {
        let type_name = self
            .context
            .registry()
            .canonical_name(&row.type_name)
            .unwrap_or(&row.type_name)
            .to_owned();
        self.rows.write().insert((type_name, row.id), row);
    }

    /// Removes a row.
    pub fn remove(&self, type_name: &str, id: EntityId) {
        self.rows.write().remove(&(type_name.to_owned(), id));
    }

    /// Builds a stand-in bound to this access without recording a call.
    pub fn materialize(&self, row: &TransferObject) -> EntityRef {
        self.context.materialize(row).expect("row fits the model")
    }

    /// A weak handle for lazy sequences.
    pub fn handle(self: &Arc<Self>) -> AccessHandle {
        let weak = Arc::downgrade(self);
        let access: Weak<dyn EntityAccess> = weak;
        AccessHandle::new(access)
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<AccessCall> {
        self.calls.lock().clone()
    }

    /// Ids passed to `get_one`, in order.
    pub fn get_one_calls(&self) -> Vec<EntityId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                AccessCall::One(_, id) => Some(*id),
                AccessCall::Many(..) => None,
            })
            .collect()
    }

    /// Id lists passed to `get_many`, in order.
    pub fn get_many_calls(&self) -> Vec<Vec<EntityId>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                AccessCall::Many(_, ids) => Some(ids.clone()),
                AccessCall::One(..) => None,
            })
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn row(&self, type_name: &str, id: EntityId) -> Option<TransferObject> {
        let type_name = self.context.registry().canonical_name(type_name)?;
        self.rows.read().get(&(type_name.to_owned(), id)).cloned()
    }
}

impl EntityAccess for RecordingAccess {
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.calls.lock().push(AccessCall::One(type_name.to_owned(), id));
        let row = self
            .row(type_name, id)
            .ok_or_else(|| entilink_core::AccessError::not_found(type_name, id))?;
        self.context.materialize(&row)
    }

    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        self.calls
            .lock()
            .push(AccessCall::Many(type_name.to_owned(), ids.to_vec()));
        let rows: Vec<TransferObject> = ids.iter().filter_map(|id| self.row(type_name, *id)).collect();
        self.context.materialize_all(&rows)
    }
}

/// Controller wrapper that records the name of every call reaching it.
pub struct RecordingController {
    inner: Arc<dyn ModelController>,
    calls: Mutex<Vec<&'static str>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingController {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ModelController>) -> Arc<Self> {
        Self::build(inner, None)
    }

    /// Wraps `inner` and holds every call open for `delay` before delegating.
    pub fn with_delay(inner: Arc<dyn ModelController>, delay: Duration) -> Arc<Self> {
        Self::build(inner, Some(delay))
    }

    fn build(inner: Arc<dyn ModelController>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(Vec::new()),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Names of the calls so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// How often `operation` was called.
    pub fn count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == operation).count()
    }

    /// Largest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Forgets the recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
        self.peak.store(0, Ordering::SeqCst);
    }

    fn record(&self, operation: &'static str) -> InFlight<'_> {
        self.calls.lock().push(operation);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ModelController for RecordingController {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let _call = self.record("get_entities");
        self.inner.get_entities(type_name)
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        let _call = self.record("get_ids");
        self.inner.get_ids(type_name)
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        let _call = self.record("get_entity_count");
        self.inner.get_entity_count(type_name)
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        let _call = self.record("get_entity_by_id");
        self.inner.get_entity_by_id(type_name, id)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        let _call = self.record("get_entities_by_ids");
        self.inner.get_entities_by_ids(type_name, ids)
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        let _call = self.record("create_new");
        self.inner.create_new(type_name)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        let _call = self.record("create_copy");
        self.inner.create_copy(entity)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        let _call = self.record("update");
        self.inner.update(entities)
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        let _call = self.record("delete");
        self.inner.delete(entity)
    }

    fn check_writable(&self, entity: &EntityRef) -> AccessResult<()> {
        self.inner.check_writable(entity)
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        let _call = self.record("version_of");
        self.inner.version_of(type_name, id)
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.inner.bind_entity_access(access);
    }

    fn close(&self) -> AccessResult<()> {
        let _call = self.record("close");
        self.inner.close()
    }
}
