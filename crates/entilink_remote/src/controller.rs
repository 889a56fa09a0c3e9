//! The remote backend controller.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::http::{HttpClient, HttpResponse};
use crate::wire::{ErrorBody, ErrorKind, Route};
use entilink_core::{
    AccessError, AccessResult, EntityAccess, EntityId, EntityList, EntityModel, EntityRef,
    FetchRegistry, LazyContext, ModelController, RelationKind, TransferObject, TypeRegistry,
    VersionToken,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Backend controller talking to a REST service.
///
/// Every response is turned into fresh stand-ins; identity is the cache
/// decorator's business.
pub struct RemoteController<C: HttpClient> {
    config: RemoteConfig,
    client: C,
    context: LazyContext,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient + 'static> RemoteController<C> {
    /// Creates a controller sending requests through `client`.
    pub fn new(config: RemoteConfig, client: C, registry: Arc<TypeRegistry>) -> Arc<Self> {
        let fetches = Arc::new(FetchRegistry::new(config.fetch_depth_limit));
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let fallback: Weak<dyn EntityAccess> = weak.clone();
            Self {
                config,
                client,
                context: LazyContext::new(registry, fallback, fetches),
                connected: AtomicBool::new(true),
                last_error: RwLock::new(None),
            }
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// The HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns true until the controller is closed, while the client is healthy.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn model(&self, type_name: &str) -> AccessResult<Arc<EntityModel>> {
        Ok(Arc::clone(self.context.registry().require(type_name)?))
    }

    fn send(&self, route: Route, body: Option<Vec<u8>>) -> RemoteResult<HttpResponse> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RemoteError::NotConnected);
        }
        let mut request = route.request(&self.config.path_prefix);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        debug!(method = %request.method, path = %request.path, "sending request");

        let response = self
            .client
            .execute(&self.config.base_url, request)
            .map_err(|err| {
                *self.last_error.write() = Some(err.to_string());
                err
            })?;
        if !response.is_success() {
            let body = serde_json::from_slice::<ErrorBody>(&response.body).unwrap_or_else(|_| {
                ErrorBody::new(
                    ErrorKind::Internal,
                    String::from_utf8_lossy(&response.body).into_owned(),
                )
            });
            warn!(status = response.status, message = %body.message, "request failed");
            return Err(RemoteError::Status {
                status: response.status,
                body,
            });
        }
        *self.last_error.write() = None;
        Ok(response)
    }

    fn fetch<T: DeserializeOwned>(&self, route: Route) -> AccessResult<T> {
        let response = self.send(route, None)?;
        Ok(serde_json::from_slice(&response.body).map_err(RemoteError::from)?)
    }

    fn submit(&self, route: Route, transfer: &TransferObject) -> AccessResult<TransferObject> {
        let body = serde_json::to_vec(transfer).map_err(RemoteError::from)?;
        let response = self.send(route, Some(body))?;
        Ok(serde_json::from_slice(&response.body).map_err(RemoteError::from)?)
    }

    fn materialize_list(&self, transfers: &[TransferObject]) -> AccessResult<EntityList> {
        Ok(EntityList::Loaded(self.context.materialize_all(transfers)?))
    }

    /// The transfer object posted for a copy of `entity`.
    ///
    /// Primitives and many-to-one references are copied; every other
    /// relation starts empty.
    fn copy_transfer(entity: &EntityRef) -> TransferObject {
        let source = TransferObject::from_entity(entity);
        let mut copy = TransferObject::new(source.type_name.clone(), EntityId::UNASSIGNED);
        copy.fields = source.fields;
        for relation in entity.model().relations() {
            if relation.is_many() {
                copy.many.insert(relation.name.clone(), Vec::new());
            } else if relation.kind == RelationKind::ManyToOne {
                let parent = source.one.get(&relation.name).copied().unwrap_or_default();
                copy.one.insert(relation.name.clone(), parent);
            } else {
                copy.one.insert(relation.name.clone(), EntityId::UNASSIGNED);
            }
        }
        copy
    }
}

impl<C: HttpClient + 'static> ModelController for RemoteController<C> {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let model = self.model(type_name)?;
        let transfers: Vec<TransferObject> = self.fetch(Route::List(model.path()))?;
        self.materialize_list(&transfers)
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        let model = self.model(type_name)?;
        self.fetch(Route::Ids(model.path()))
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        let model = self.model(type_name)?;
        self.fetch(Route::Count(model.path()))
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        let model = self.model(type_name)?;
        let transfer: TransferObject = self.fetch(Route::One(model.path(), id))?;
        self.context.materialize(&transfer)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        let model = self.model(type_name)?;
        if ids.is_empty() {
            return Ok(EntityList::Loaded(Vec::new()));
        }
        let mut transfers: Vec<TransferObject> = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.config.max_ids_per_request.max(1)) {
            let batch: Vec<TransferObject> = self.fetch(Route::ByIds(model.path(), chunk.to_vec()))?;
            transfers.extend(batch);
        }
        self.materialize_list(&transfers)
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        let model = self.model(type_name)?;
        let blank = TransferObject::from_entity(&EntityRef::blank(Arc::clone(&model)));
        let created = self.submit(Route::Create(model.path()), &blank)?;
        info!(type_name = model.name(), id = %created.id, "entity created remotely");
        self.context.materialize(&created)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        let model = Arc::clone(entity.model());
        let created = self.submit(Route::Create(model.path()), &Self::copy_transfer(entity))?;
        info!(type_name = model.name(), source = %entity.id(), id = %created.id, "entity copied remotely");

        let copy = self.context.materialize(&created)?;
        for relation in model.relations() {
            if relation.kind == RelationKind::ManyToOne {
                if let Err(err) = copy.resolve(&relation.name) {
                    warn!(entity = %copy, relation = %relation.name, error = %err, "copy parent not linked");
                }
            }
        }
        Ok(copy)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        for entity in entities {
            let id = entity.id();
            if !id.is_assigned() {
                return Err(AccessError::malicious_id(entity.type_name(), id));
            }
            let stored = self.submit(
                Route::Update(entity.model().path(), id),
                &TransferObject::from_entity(entity),
            )?;
            entity.set_version(stored.version);
        }
        debug!(count = entities.len(), "entities updated remotely");
        Ok(())
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        let id = entity.id();
        if !id.is_assigned() {
            return Err(AccessError::malicious_id(entity.type_name(), id));
        }
        self.send(Route::Delete(entity.model().path(), id), None)?;
        info!(entity = %entity, "entity deleted remotely");
        Ok(())
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        let model = self.model(type_name)?;
        self.fetch(Route::Version(model.path(), id))
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.context.bind(access);
    }

    fn close(&self) -> AccessResult<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(base_url = %self.config.base_url, "remote controller closed");
        }
        Ok(())
    }
}

impl<C: HttpClient + 'static> EntityAccess for RemoteController<C> {
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.get_entity_by_id(type_name, id)
    }

    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        self.get_entities_by_ids(type_name, ids)?.into_vec()
    }
}

#[cfg(feature = "reqwest")]
impl RemoteController<crate::reqwest_client::ReqwestClient> {
    /// Connects to the service described by `config` over `reqwest`.
    pub fn connect(config: RemoteConfig, registry: Arc<TypeRegistry>) -> AccessResult<Arc<Self>> {
        let client = crate::reqwest_client::ReqwestClient::new(config.timeout)?;
        Ok(Self::new(config, client, registry))
    }
}
