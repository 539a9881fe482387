//! # RAG Store
//!
//! Storage backend for chat sessions and messages: CRUD endpoints guarded by
//! API-key authentication, per-key rate limiting, and normalized error
//! reporting.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Filter chain (Request Log → Rate Limit → Auth)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Error normalization boundary (problem responses)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, sessions, messages)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Stores (SessionStore, MessageStore)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SQLite (WAL, enforced constraints)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every inbound request passes the correlation logger, then the rate
//! limiter, then the authenticator, then the business handler; any failure
//! along the way is rendered once, at the boundary, into a stable problem
//! shape (`type`, `title`, `status`, `detail`, `instance`, `timestamp`,
//! plus `retryAfter` for rate-limit denials).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rag_store::{build_router, AppState, Config, Store};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pool = rag_store::store::connect(&config.database_url).await?;
//!     let state = AppState::new(Store::new(pool), config);
//!     let app = build_router(state);
//!
//!     // Serve the app...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! API_KEY_PRIMARY=your-secret-key RATE_LIMIT_PER_MINUTE=60 cargo run
//! ```
//!
//! Clients authenticate with the `X-API-Key` header. Without
//! `API_KEY_PRIMARY` the service fails closed: every protected request is
//! rejected.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{ApiError, AppResult};
pub use routes::build_router;
pub use state::AppState;
pub use store::Store;
