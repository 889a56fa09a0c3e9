//! Pipeline configuration.

/// Which decorators a pipeline is assembled from.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wrap the backend in the cache decorator.
    pub cache: bool,

    /// Answer list reads with lazy sequences.
    pub lazy_sequences: bool,

    /// Make lazy sequences iterate entry by entry instead of fetching all.
    pub lazy_iterators: bool,

    /// Serialize all calls behind one lock.
    pub synchronize: bool,

    /// Validate ids, version tokens and sever relations before delete.
    pub consistency_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: true,
            lazy_sequences: false,
            lazy_iterators: false,
            synchronize: true,
            consistency_check: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with every decorator disabled.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            cache: false,
            lazy_sequences: false,
            lazy_iterators: false,
            synchronize: false,
            consistency_check: false,
        }
    }

    /// Sets whether to cache.
    #[must_use]
    pub const fn cache(mut self, value: bool) -> Self {
        self.cache = value;
        self
    }

    /// Sets whether list reads return lazy sequences.
    #[must_use]
    pub const fn lazy_sequences(mut self, value: bool) -> Self {
        self.lazy_sequences = value;
        self
    }

    /// Sets whether lazy sequences iterate lazily.
    #[must_use]
    pub const fn lazy_iterators(mut self, value: bool) -> Self {
        self.lazy_iterators = value;
        self
    }

    /// Sets whether to serialize calls.
    #[must_use]
    pub const fn synchronize(mut self, value: bool) -> Self {
        self.synchronize = value;
        self
    }

    /// Sets whether to run consistency checks.
    #[must_use]
    pub const fn consistency_check(mut self, value: bool) -> Self {
        self.consistency_check = value;
        self
    }
}
