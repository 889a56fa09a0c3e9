//! Remote backend configuration.

use crate::wire::{DEFAULT_MAX_IDS, DEFAULT_PREFIX};
use entilink_core::DEFAULT_FETCH_DEPTH;
use std::time::Duration;

/// Configuration for a remote controller.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the service, e.g. `http://localhost:4053`.
    pub base_url: String,
    /// Prefix of every route.
    pub path_prefix: String,
    /// Request timeout.
    pub timeout: Duration,
    /// How deeply relation fetches may nest on one thread.
    pub fetch_depth_limit: usize,
    /// Most ids sent in one by-ids request; longer lists are split.
    pub max_ids_per_request: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4053".to_owned(),
            path_prefix: DEFAULT_PREFIX.to_owned(),
            timeout: Duration::from_secs(30),
            fetch_depth_limit: DEFAULT_FETCH_DEPTH,
            max_ids_per_request: DEFAULT_MAX_IDS,
        }
    }
}

impl RemoteConfig {
    /// Creates a configuration for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration for `host:port` over plain HTTP.
    pub fn for_host(host: &str, port: u16) -> Self {
        Self::new(format!("http://{host}:{port}"))
    }

    /// Sets the route prefix.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the most ids sent in one by-ids request.
    #[must_use]
    pub fn with_max_ids_per_request(mut self, max: usize) -> Self {
        self.max_ids_per_request = max;
        self
    }

    /// Sets the relation fetch nesting limit.
    #[must_use]
    pub fn with_fetch_depth_limit(mut self, limit: usize) -> Self {
        self.fetch_depth_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RemoteConfig::default();
        assert_eq!(config.path_prefix, "/entity");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_ids_per_request, 1000);
    }

    #[test]
    fn builder_pattern() {
        let config = RemoteConfig::for_host("example.org", 8080)
            .with_path_prefix("/api")
            .with_timeout(Duration::from_secs(2))
            .with_fetch_depth_limit(0)
            .with_max_ids_per_request(50);
        assert_eq!(config.base_url, "http://example.org:8080");
        assert_eq!(config.path_prefix, "/api");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.fetch_depth_limit, 0);
        assert_eq!(config.max_ids_per_request, 50);
    }
}
