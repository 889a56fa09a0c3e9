//! Server configuration.

use entilink_remote::wire::{DEFAULT_MAX_IDS, DEFAULT_PREFIX};

/// Configuration for the request handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Route prefix, `/entity` by default.
    pub path_prefix: String,
    /// Maximum number of ids accepted by one `GET /{type}?id=` request.
    pub max_ids_per_request: usize,
}

impl ServerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            path_prefix: DEFAULT_PREFIX.to_owned(),
            max_ids_per_request: DEFAULT_MAX_IDS,
        }
    }

    /// Sets the route prefix.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Sets the id limit per request.
    pub fn with_max_ids_per_request(mut self, max: usize) -> Self {
        self.max_ids_per_request = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
