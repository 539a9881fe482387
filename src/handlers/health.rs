//! Health endpoint backed by a database connectivity probe.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// Runs `SELECT 1` against the pool: 200 `{"status":"UP"}` when the database
/// answers, 503 `{"status":"DOWN"}` when it does not. Exempt from
/// authentication so load balancers and probes can reach it without a key.
#[instrument(skip(state))]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "UP"),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "DOWN")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            database: "SQLite".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }),
    )
}
