//! The loopback-capable entity server.

use crate::config::ServerConfig;
use crate::handler::RequestHandler;
use entilink_core::{ModelController, Pipeline, TypeRegistry};
use entilink_remote::{HttpRequest, HttpResponse, LoopbackServer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Serves a controller pipeline over the REST surface.
///
/// Any HTTP front end can forward requests to [`EntityServer::handle`];
/// tests plug it straight into a `LoopbackClient`.
///
/// # Example
///
/// ```rust,ignore
/// let server = EntityServer::for_pipeline(ServerConfig::default(), store_pipeline, registry.clone());
/// let remote = RemoteController::new(RemoteConfig::default(), LoopbackClient::new(server), registry);
/// ```
pub struct EntityServer {
    handler: RequestHandler,
    served: AtomicU64,
    failed: AtomicU64,
}

impl EntityServer {
    /// Creates a server over any controller.
    pub fn new(
        config: ServerConfig,
        controller: Arc<dyn ModelController>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            handler: RequestHandler::new(config, controller, registry),
            served: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Creates a server over a built pipeline.
    pub fn for_pipeline(config: ServerConfig, pipeline: Pipeline, registry: Arc<TypeRegistry>) -> Self {
        Self::new(config, Arc::new(pipeline), registry)
    }

    /// Number of requests handled so far.
    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Number of requests answered with an error status.
    pub fn requests_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }
}

impl LoopbackServer for EntityServer {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.handler.handle(request);
        self.served.fetch_add(1, Ordering::Relaxed);
        if !response.is_success() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        response
    }
}
