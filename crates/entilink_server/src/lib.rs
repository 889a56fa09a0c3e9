//! # EntiLink Server
//!
//! Reference REST request handler for EntiLink.
//!
//! This crate provides:
//! - A [`RequestHandler`] routing the REST surface of `entilink_remote`
//!   onto any controller, typically a cached store pipeline
//! - Transfer-object application with counterpart bookkeeping
//! - An [`EntityServer`] usable behind a `LoopbackClient`
//!
//! The crate carries no network listener; an HTTP front end only needs
//! to build an `HttpRequest` and return the `HttpResponse`.
//!
//! # Versions
//!
//! Every successful write answers with the stored transfer object, so the
//! client adopts the new version token. Optimistic concurrency is checked
//! by the client's consistency decorator through
//! `GET /{type}/{id}/version`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::EntityServer;
