//! Store configuration.

use entilink_core::DEFAULT_FETCH_DEPTH;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the journal after every write (safer but slower).
    pub sync_on_write: bool,

    /// How deeply relation fetches may nest on one thread.
    pub fetch_depth_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            fetch_depth_limit: DEFAULT_FETCH_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the relation fetch nesting limit.
    #[must_use]
    pub const fn fetch_depth_limit(mut self, value: usize) -> Self {
        self.fetch_depth_limit = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
        assert_eq!(config.fetch_depth_limit, DEFAULT_FETCH_DEPTH);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .create_if_missing(false)
            .sync_on_write(false)
            .fetch_depth_limit(3);
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
        assert_eq!(config.fetch_depth_limit, 3);
    }
}
