//! # EntiLink Core
//!
//! Identity-consistent data access over interchangeable backends.
//!
//! This crate provides:
//! - An entity model and type registry built from a model description
//! - An identity cache holding one live instance per `(type, id)`
//! - Lazy entity stand-ins whose relations load on first access
//! - Lazy sequences resolved entry by entry or in bulk
//! - The [`ModelController`] contract with cache, consistency,
//!   synchronizing and lazy-sequence decorators
//! - A [`ControllerBuilder`] composing them into a [`Pipeline`]
//!
//! Backends live in `entilink_store` (local journal) and
//! `entilink_remote` (HTTP).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod cache;
mod config;
mod controller;
mod entity;
mod error;
mod fetch;
mod model;
mod sequence;
mod standin;
mod transfer;

pub use access::{AccessBinding, AccessHandle, ControllerAccess, EntityAccess};
pub use cache::{IdentityCache, Registration};
pub use config::Config;
pub use controller::{
    CacheAdmin, CacheController, ConsistencyDecorator, ControllerBuilder, LazySequenceDecorator,
    ModelController, Pipeline, SynchronizingDecorator,
};
pub use entity::{Entity, EntityRef, RelationValue};
pub use error::{AccessError, AccessResult};
pub use fetch::{current_depth, FetchGuard, FetchKey, FetchRegistry, DEFAULT_FETCH_DEPTH};
pub use model::{
    EntityDescription, EntityId, EntityModel, FieldDescription, ModelDescription, PrimitiveField,
    PrimitiveKind, RelationDescription, RelationField, RelationKind, TypeRegistry, Value,
    VersionToken,
};
pub use sequence::{EntityList, LazySequence, SequenceIter};
pub use standin::LazyContext;
pub use transfer::TransferObject;
