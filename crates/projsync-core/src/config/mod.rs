//! Engine configuration.

use std::time::Duration;

/// Default lifetime of a cached upload result
pub const DEFAULT_REQUEST_CACHE_TTL: Duration = Duration::from_secs(600);
/// Default number of cached upload results
pub const DEFAULT_REQUEST_CACHE_CAPACITY: usize = 1024;

/// Tunables of a `SyncCoordinator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long an upload result is replayed for a repeated `(deviceId, requestId)`.
    /// Zero disables the idempotency cache.
    pub request_cache_ttl: Duration,
    /// Maximum number of cached upload results
    pub request_cache_capacity: usize,
    /// Page limit for downloads that do not ask for one (default: unlimited)
    pub default_page_limit: Option<usize>,
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            request_cache_ttl: DEFAULT_REQUEST_CACHE_TTL,
            request_cache_capacity: DEFAULT_REQUEST_CACHE_CAPACITY,
            default_page_limit: None,
        }
    }

    /// Set the idempotency cache TTL
    #[must_use]
    pub const fn with_request_cache_ttl(mut self, ttl: Duration) -> Self {
        self.request_cache_ttl = ttl;
        self
    }

    /// Set the idempotency cache capacity (at least one entry)
    #[must_use]
    pub const fn with_request_cache_capacity(mut self, capacity: usize) -> Self {
        self.request_cache_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Page downloads that do not set their own limit
    #[must_use]
    pub const fn with_default_page_limit(mut self, limit: usize) -> Self {
        self.default_page_limit = Some(if limit == 0 { 1 } else { limit });
        self
    }

    /// Return full deltas unless a download asks for a limit
    #[must_use]
    pub const fn without_default_page_limit(mut self) -> Self {
        self.default_page_limit = None;
        self
    }

    /// Whether upload results are cached at all
    pub const fn request_cache_enabled(&self) -> bool {
        !self.request_cache_ttl.is_zero()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
