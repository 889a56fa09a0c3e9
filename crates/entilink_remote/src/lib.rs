//! # EntiLink Remote
//!
//! HTTP backend for EntiLink.
//!
//! [`RemoteController`] implements the controller contract over a REST
//! service (see [`wire`] for the routes). The HTTP client is pluggable:
//!
//! - [`LoopbackClient`] routes requests to an in-process [`LoopbackServer`]
//! - `ReqwestClient` (feature `reqwest`) uses `reqwest::blocking`
//!
//! ## Usage
//!
//! ```rust,ignore
//! let remote = RemoteController::new(RemoteConfig::for_host("localhost", 4053), client, registry.clone());
//! let pipeline = ControllerBuilder::new(remote, registry).with_cache().build();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod http;
#[cfg(feature = "reqwest")]
mod reqwest_client;
pub mod wire;

pub use config::RemoteConfig;
pub use controller::RemoteController;
pub use error::{RemoteError, RemoteResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer};
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;
pub use wire::{ErrorBody, ErrorKind, Route};
