//! Application routing configuration with the filter-chain middleware stack.
//!
//! # Filter Chain (execution order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request Log    │ ← correlation id + entry/exit lines (skips exempt paths)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Rate Limit     │ ← 429 + Retry-After when a key's bucket is drained
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← 401 JSON (bypassed for public endpoints)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Error Normalizer │ ← renders handler failures as problem responses
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! CORS and HTTP tracing wrap the whole stack. Axum applies layers bottom to
//! top, so the last `.layer(...)` call here runs first on the way in.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::normalize_errors;
use crate::handlers;
use crate::middleware::{ApiKeyAuthLayer, ApiKeys, RateLimitLayer, RequestLogLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let router = Router::new()
        // Health (public, exempt from auth)
        .route("/actuator/health", get(handlers::health_check))
        // Session endpoints
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions", get(handlers::list_sessions))
        .route("/api/v1/sessions/{session_id}", get(handlers::get_session))
        .route(
            "/api/v1/sessions/{session_id}",
            patch(handlers::update_session),
        )
        .route(
            "/api/v1/sessions/{session_id}/favorite",
            patch(handlers::toggle_favorite),
        )
        .route(
            "/api/v1/sessions/{session_id}",
            delete(handlers::delete_session),
        )
        // Message endpoints
        .route(
            "/api/v1/sessions/{session_id}/messages",
            post(handlers::add_message),
        )
        .route(
            "/api/v1/sessions/{session_id}/messages",
            get(handlers::get_messages),
        );

    if !config.auth_configured() {
        warn!("API_KEY_PRIMARY is not set - every protected request will be rejected");
    }
    info!(
        tokens_per_minute = config.rate_limit_per_minute,
        "Filter chain configured"
    );

    let auth_layer = ApiKeyAuthLayer::new(ApiKeys::new(
        config.primary_api_key.clone(),
        config.secondary_api_key.clone(),
    ));

    // Applied bottom to top: body limit innermost, CORS outermost.
    router
        .layer(DefaultBodyLimit::max(config.max_request_body_size))
        .layer(axum::middleware::from_fn(normalize_errors))
        .layer(auth_layer)
        .layer(RateLimitLayer::new(state.rate_limiter.clone()))
        .layer(RequestLogLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build CORS layer from configuration.
///
/// `*` allows any origin - convenient for development, avoid in production.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
