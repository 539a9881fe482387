//! Shared application state for Axum handlers.
//!
//! The state is cloned for each request handler; all members are either
//! `Arc`-wrapped or internally reference-counted, so cloning is cheap and
//! every clone observes the same rate-limiter registry and connection pool.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::middleware::KeyedRateLimiter;
use crate::store::Store;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session and message repositories
    pub store: Store,
    /// Application configuration
    pub config: Arc<Config>,
    /// Per-API-key rate bucket registry (shared across all requests)
    pub rate_limiter: Arc<KeyedRateLimiter>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create new application state from a store and configuration.
    pub fn new(store: Store, config: Config) -> Self {
        let rate_limiter = Arc::new(KeyedRateLimiter::new(config.rate_limit_per_minute));
        Self {
            store,
            config: Arc::new(config),
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
