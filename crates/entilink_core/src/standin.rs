//! Lazy entity stand-ins.
//!
//! Backends turn every [`TransferObject`] they receive into a stand-in: an
//! [`EntityRef`] whose primitive fields are filled in eagerly and whose
//! relation slots still hold the captured ids. Slots that need no I/O
//! (empty collections, absent to-one ids) start out resolved. The others
//! are fetched through the entity access bound at materialization time on
//! first access; see [`EntityRef::related_many`].

use crate::access::{AccessBinding, AccessHandle, EntityAccess};
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use crate::fetch::FetchRegistry;
use crate::model::{EntityId, TypeRegistry, Value};
use crate::transfer::TransferObject;
use std::sync::{Arc, Weak};

/// What a stand-in needs to load its relations later.
#[derive(Debug, Clone)]
pub(crate) struct RelationLoader {
    pub(crate) access: AccessHandle,
    pub(crate) fetches: Arc<FetchRegistry>,
}

/// Materialization context owned by a backend controller.
#[derive(Debug)]
pub struct LazyContext {
    registry: Arc<TypeRegistry>,
    binding: AccessBinding,
    fetches: Arc<FetchRegistry>,
}

impl LazyContext {
    /// Creates a context whose stand-ins load through `fallback` until
    /// [`LazyContext::bind`] installs another access.
    pub fn new(
        registry: Arc<TypeRegistry>,
        fallback: Weak<dyn EntityAccess>,
        fetches: Arc<FetchRegistry>,
    ) -> Self {
        Self {
            registry,
            binding: AccessBinding::new(AccessHandle::new(fallback)),
            fetches,
        }
    }

    /// The type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The fetch registry shared by all stand-ins of this context.
    pub fn fetches(&self) -> &Arc<FetchRegistry> {
        &self.fetches
    }

    /// Installs the access used by stand-ins created from now on.
    pub fn bind(&self, access: Weak<dyn EntityAccess>) {
        self.binding.bind(AccessHandle::new(access));
    }

    /// The access currently handed to new stand-ins and lazy sequences.
    pub fn access(&self) -> AccessHandle {
        self.binding.current()
    }

    /// Builds a stand-in from a transfer object.
    ///
    /// # Errors
    ///
    /// Fails if the type is unknown, a primitive value does not fit its
    /// field, or a transfer object carries a field the model lacks.
    pub fn materialize(&self, transfer: &TransferObject) -> AccessResult<EntityRef> {
        let model = Arc::clone(self.registry.require(&transfer.type_name)?);

        for name in transfer
            .fields
            .keys()
            .chain(transfer.one.keys())
            .chain(transfer.many.keys())
        {
            if model.field_index(name).is_none() && model.relation_index(name).is_none() {
                return Err(AccessError::UnknownField {
                    type_name: model.name().to_owned(),
                    field: name.clone(),
                });
            }
        }

        let fields = model
            .fields()
            .iter()
            .map(|field| match transfer.fields.get(&field.name) {
                Some(json) => Value::from_json(&field.name, &field.kind, json),
                None => Ok(Value::Null),
            })
            .collect::<AccessResult<Vec<_>>>()?;

        let pending = model
            .relations()
            .iter()
            .map(|relation| {
                if relation.is_many() {
                    transfer
                        .many
                        .get(&relation.name)
                        .filter(|ids| !ids.is_empty())
                        .cloned()
                } else {
                    transfer
                        .one
                        .get(&relation.name)
                        .copied()
                        .filter(|id| id.is_assigned())
                        .map(|id| vec![id])
                }
            })
            .collect::<Vec<Option<Vec<EntityId>>>>();

        let loader = RelationLoader {
            access: self.binding.current(),
            fetches: Arc::clone(&self.fetches),
        };
        let entity = EntityRef::build(model, transfer.id, transfer.version, Some(loader));
        entity.prime(fields, pending);
        Ok(entity)
    }

    /// Materializes a batch of transfer objects in order.
    pub fn materialize_all(&self, transfers: &[TransferObject]) -> AccessResult<Vec<EntityRef>> {
        transfers.iter().map(|t| self.materialize(t)).collect()
    }
}
