//! Routes REST requests onto a controller pipeline.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use entilink_core::{
    AccessError, EntityId, EntityModel, EntityRef, ModelController, TransferObject, TypeRegistry,
    Value,
};
use entilink_remote::wire::Route;
use entilink_remote::{HttpRequest, HttpResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Handler for entity requests.
///
/// Reads go straight to the served controller. Writes are serialized:
/// applying a transfer object and persisting the touched entities happen
/// under one lock.
pub struct RequestHandler {
    config: ServerConfig,
    controller: Arc<dyn ModelController>,
    registry: Arc<TypeRegistry>,
    writes: Mutex<()>,
}

impl RequestHandler {
    /// Creates a handler serving `controller`.
    pub fn new(
        config: ServerConfig,
        controller: Arc<dyn ModelController>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            config,
            controller,
            registry,
            writes: Mutex::new(()),
        }
    }

    /// The handler configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handles one request, turning every failure into an error response.
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let route = match Route::parse(request, &self.config.path_prefix) {
            Ok(route) => route,
            Err((status, body)) => return HttpResponse::json(status, &body),
        };
        debug!(method = %request.method, path = %request.path, "handling request");
        self.dispatch(route, request.body.as_deref())
            .unwrap_or_else(ServerError::into_response)
    }

    fn dispatch(&self, route: Route, body: Option<&[u8]>) -> ServerResult<HttpResponse> {
        match route {
            Route::List(path) => {
                let model = self.model(&path)?;
                let entities = self.controller.get_entities(model.name())?.into_vec()?;
                Ok(HttpResponse::json(200, &transfers(&entities)))
            }
            Route::ByIds(path, ids) => {
                let model = self.model(&path)?;
                if ids.len() > self.config.max_ids_per_request {
                    return Err(ServerError::TooManyIds {
                        requested: ids.len(),
                        limit: self.config.max_ids_per_request,
                    });
                }
                let entities = self
                    .controller
                    .get_entities_by_ids(model.name(), &ids)?
                    .into_vec()?;
                Ok(HttpResponse::json(200, &transfers(&entities)))
            }
            Route::Ids(path) => {
                let model = self.model(&path)?;
                Ok(HttpResponse::json(200, &self.controller.get_ids(model.name())?))
            }
            Route::Count(path) => {
                let model = self.model(&path)?;
                Ok(HttpResponse::json(200, &self.controller.get_entity_count(model.name())?))
            }
            Route::One(path, id) => {
                let model = self.model(&path)?;
                let entity = self.controller.get_entity_by_id(model.name(), id)?;
                Ok(HttpResponse::json(200, &TransferObject::from_entity(&entity)))
            }
            Route::Version(path, id) => {
                let model = self.model(&path)?;
                Ok(HttpResponse::json(200, &self.controller.version_of(model.name(), id)?))
            }
            Route::Create(path) => {
                let model = self.model(&path)?;
                let transfer = body.map(parse_transfer).transpose()?;
                if let Some(transfer) = &transfer {
                    check_shape(&model, transfer)?;
                }
                let _guard = self.writes.lock();
                let entity = self.controller.create_new(model.name())?;
                if let Some(transfer) = transfer {
                    let touched = self.apply(&entity, &model, &transfer)?;
                    self.controller.update(&touched)?;
                }
                info!(entity = %entity, "entity created");
                Ok(HttpResponse::json(201, &TransferObject::from_entity(&entity)))
            }
            Route::Update(path, id) => {
                let model = self.model(&path)?;
                let transfer = parse_transfer(body.ok_or_else(|| {
                    ServerError::InvalidRequest("update without a body".to_owned())
                })?)?;
                if transfer.id != id {
                    return Err(ServerError::InvalidRequest(format!(
                        "body id {} does not match path id {id}",
                        transfer.id
                    )));
                }
                check_shape(&model, &transfer)?;
                let _guard = self.writes.lock();
                let entity = self.controller.get_entity_by_id(model.name(), id)?;
                let touched = self.apply(&entity, &model, &transfer)?;
                self.controller.update(&touched)?;
                debug!(entity = %entity, touched = touched.len(), "entity updated");
                Ok(HttpResponse::json(200, &TransferObject::from_entity(&entity)))
            }
            Route::Delete(path, id) => {
                let model = self.model(&path)?;
                let _guard = self.writes.lock();
                let entity = self.controller.get_entity_by_id(model.name(), id)?;
                self.controller.delete(&entity)?;
                info!(entity = %entity, "entity deleted");
                Ok(HttpResponse::no_content())
            }
        }
    }

    fn model(&self, path: &str) -> ServerResult<Arc<EntityModel>> {
        Ok(Arc::clone(self.registry.require(path)?))
    }

    /// Copies a transfer object checked by [`check_shape`] onto `entity`.
    ///
    /// Every referenced entity is looked up before anything changes.
    /// Returns `entity` followed by every counterpart whose inverse
    /// relation changed; all of them need persisting.
    fn apply(
        &self,
        entity: &EntityRef,
        model: &EntityModel,
        transfer: &TransferObject,
    ) -> ServerResult<Vec<EntityRef>> {
        let mut links = Vec::with_capacity(transfer.one.len());
        for (name, id) in &transfer.one {
            let relation = &model.relations()[model.relation_position(name)?];
            let current = entity.related_one(name)?;
            if current.as_ref().map_or(EntityId::UNASSIGNED, |e| e.id()) == *id {
                continue;
            }
            let target = if id.is_assigned() {
                Some(self.controller.get_entity_by_id(&relation.target, *id)?)
            } else {
                None
            };
            links.push((name, relation.counter.is_some(), current, target));
        }

        let mut memberships = Vec::with_capacity(transfer.many.len());
        for (name, ids) in &transfer.many {
            let relation = &model.relations()[model.relation_position(name)?];
            let members = entity.related_many(name)?;
            let missing: Vec<EntityId> = ids
                .iter()
                .copied()
                .filter(|id| !members.iter().any(|m| m.id() == *id))
                .collect();
            let added = if missing.is_empty() {
                Vec::new()
            } else {
                self.controller
                    .get_entities_by_ids(&relation.target, &missing)?
                    .into_vec()?
            };
            if let Some(absent) = missing
                .iter()
                .find(|id| !added.iter().any(|e| e.id() == **id))
            {
                return Err(AccessError::not_found(relation.target.clone(), *absent).into());
            }
            let removed: Vec<EntityRef> = members
                .into_iter()
                .filter(|m| !ids.contains(&m.id()))
                .collect();
            memberships.push((name, relation.counter.is_some(), removed, added));
        }

        for (name, json) in &transfer.fields {
            let index = model.field_position(name)?;
            let field = &model.fields()[index];
            entity.set_field_at(index, Value::from_json(name, &field.kind, json)?)?;
        }

        let mut touched = vec![entity.clone()];
        for (name, counted, current, target) in links {
            entity.set_related(name, target.as_ref())?;
            if counted {
                touched.extend(current);
                touched.extend(target);
            }
        }
        for (name, counted, removed, added) in memberships {
            for member in &removed {
                entity.remove_related(name, member)?;
            }
            for target in &added {
                entity.add_related(name, target)?;
            }
            if counted {
                touched.extend(removed);
                touched.extend(added);
            }
        }

        let mut unique: Vec<EntityRef> = Vec::with_capacity(touched.len());
        for candidate in touched {
            if !unique.iter().any(|e| e.ptr_eq(&candidate)) {
                unique.push(candidate);
            }
        }
        Ok(unique)
    }
}

/// Rejects unknown names and unfit values before anything is created or changed.
fn check_shape(model: &EntityModel, transfer: &TransferObject) -> ServerResult<()> {
    for (name, json) in &transfer.fields {
        let field = &model.fields()[model.field_position(name)?];
        Value::from_json(name, &field.kind, json)?;
    }
    let relations = transfer
        .one
        .keys()
        .map(|name| (name, false))
        .chain(transfer.many.keys().map(|name| (name, true)));
    for (name, many) in relations {
        let relation = &model.relations()[model.relation_position(name)?];
        if relation.is_many() != many {
            return Err(ServerError::InvalidRequest(format!(
                "{}.{name} has the wrong cardinality",
                model.name()
            )));
        }
    }
    Ok(())
}

fn parse_transfer(body: &[u8]) -> ServerResult<TransferObject> {
    Ok(serde_json::from_slice(body)?)
}

fn transfers(entities: &[EntityRef]) -> Vec<TransferObject> {
    entities.iter().map(|e| TransferObject::from_entity(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use entilink_remote::wire::{ErrorBody, ErrorKind};
    use entilink_remote::HttpMethod;
    use entilink_testkit::prelude::*;
    use serde_json::json;

    fn handler(store: &TestStore) -> RequestHandler {
        RequestHandler::new(
            ServerConfig::default(),
            Arc::new(store.pipeline()),
            Arc::clone(&store.registry),
        )
    }

    fn get(handler: &RequestHandler, path: &str) -> HttpResponse {
        handler.handle(&HttpRequest::new(HttpMethod::Get, path))
    }

    fn send(handler: &RequestHandler, method: HttpMethod, path: &str, body: serde_json::Value) -> HttpResponse {
        let body = serde_json::to_vec(&body).unwrap();
        handler.handle(&HttpRequest::new(method, path).with_body(body))
    }

    fn transfer(response: &HttpResponse) -> TransferObject {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn create_assigns_id_and_applies_fields() {
        let store = TestStore::memory();
        let handler = handler(&store);

        let response = send(
            &handler,
            HttpMethod::Post,
            "/entity/book",
            json!({"type": "Book", "id": -1, "fields": {"title": "Emma", "pages": 320}}),
        );
        assert_eq!(response.status, 201);
        let created = transfer(&response);
        assert_eq!(created.id, EntityId::new(0));
        assert!(created.version.is_some());
        assert_eq!(created.fields["title"], json!("Emma"));

        let count: usize = serde_json::from_slice(&get(&handler, "/entity/book/count").body).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn update_links_both_sides() {
        let store = TestStore::memory();
        let handler = handler(&store);
        let author = transfer(&send(&handler, HttpMethod::Post, "/entity/author", json!({"type": "Author", "id": -1})));
        let book = transfer(&send(&handler, HttpMethod::Post, "/entity/book", json!({"type": "Book", "id": -1})));

        let response = send(
            &handler,
            HttpMethod::Put,
            &format!("/entity/book/{}", book.id),
            json!({"type": "Book", "id": book.id, "one": {"author": author.id}}),
        );
        assert_eq!(response.status, 200);

        let author = transfer(&get(&handler, &format!("/entity/author/{}", author.id)));
        assert_eq!(author.many["books"], vec![book.id]);
        let row = store.export().unwrap().into_iter().find(|r| r.type_name == "Author").unwrap();
        assert_eq!(row.many["books"], vec![book.id]);
    }

    #[test]
    fn collection_membership_follows_the_body() {
        let store = TestStore::memory();
        let handler = handler(&store);
        let book = transfer(&send(&handler, HttpMethod::Post, "/entity/book", json!({"type": "Book", "id": -1})));
        let first = transfer(&send(&handler, HttpMethod::Post, "/entity/tag", json!({"type": "Tag", "id": -1})));
        let second = transfer(&send(&handler, HttpMethod::Post, "/entity/tag", json!({"type": "Tag", "id": -1})));
        let path = format!("/entity/book/{}", book.id);

        send(&handler, HttpMethod::Put, &path, json!({"type": "Book", "id": book.id, "many": {"tags": [first.id, second.id]}}));
        send(&handler, HttpMethod::Put, &path, json!({"type": "Book", "id": book.id, "many": {"tags": [second.id]}}));

        assert_eq!(transfer(&get(&handler, &path)).many["tags"], vec![second.id]);
        let first = transfer(&get(&handler, &format!("/entity/tag/{}", first.id)));
        assert!(first.many["books"].is_empty());
    }

    #[test]
    fn missing_targets_are_not_found() {
        let store = TestStore::memory();
        let handler = handler(&store);
        let book = transfer(&send(&handler, HttpMethod::Post, "/entity/book", json!({"type": "Book", "id": -1})));

        let response = send(
            &handler,
            HttpMethod::Put,
            &format!("/entity/book/{}", book.id),
            json!({"type": "Book", "id": book.id, "many": {"tags": [41]}}),
        );
        assert_eq!(response.status, 404);
    }

    #[test]
    fn bad_requests() {
        let store = TestStore::memory();
        let handler = handler(&store);

        assert_eq!(get(&handler, "/entity/shelf").status, 400);
        assert_eq!(get(&handler, "/entity/book/3").status, 404);
        assert_eq!(get(&handler, "/other").status, 404);

        let response = send(&handler, HttpMethod::Put, "/entity/book/3", json!({"type": "Book", "id": 4}));
        assert_eq!(response.status, 400);

        let response = send(&handler, HttpMethod::Post, "/entity/book", json!({"type": "Book", "id": -1, "fields": {"isbn": "1"}}));
        assert_eq!(response.status, 400);
        let body: ErrorBody = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body.kind, ErrorKind::UnknownField);
    }

    #[test]
    fn id_lists_are_capped() {
        let store = TestStore::memory();
        let handler = RequestHandler::new(
            ServerConfig::new().with_max_ids_per_request(2),
            Arc::new(store.pipeline()),
            Arc::clone(&store.registry),
        );
        let request = HttpRequest::new(HttpMethod::Get, "/entity/tag").with_query("id", "1,2");
        assert_eq!(handler.handle(&request).status, 200);
        let request = HttpRequest::new(HttpMethod::Get, "/entity/tag").with_query("id", "1,2,3");
        assert_eq!(handler.handle(&request).status, 400);
    }

    #[test]
    fn delete_answers_no_content() {
        let store = TestStore::memory();
        let handler = handler(&store);
        let tag = transfer(&send(&handler, HttpMethod::Post, "/entity/tag", json!({"type": "Tag", "id": -1})));
        let path = format!("/entity/tag/{}", tag.id);

        let response = handler.handle(&HttpRequest::new(HttpMethod::Delete, &path));
        assert_eq!(response.status, 204);
        assert_eq!(get(&handler, &path).status, 404);
    }
}
