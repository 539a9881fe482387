//! End-to-end tests for the request-interception pipeline.
//!
//! These drive the real router - correlation logging, rate limiting,
//! authentication, and error normalization all wired in the production
//! order - against a temp-file SQLite database, using
//! `tower::ServiceExt::oneshot` so no listener is needed.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rag_store::{build_router, AppState, Config, Store};

const PRIMARY_KEY: &str = "abc";
const SECONDARY_KEY: &str = "xyz";

/// Build an app over a fresh database with authentication configured.
async fn test_app(config: Config) -> (TempDir, AppState, Router) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let pool = rag_store::store::connect(&url).await.unwrap();
    let state = AppState::new(Store::new(pool), config);
    let app = build_router(state.clone());
    (dir, state, app)
}

fn secured_config() -> Config {
    Config {
        primary_api_key: Some(PRIMARY_KEY.to_string()),
        secondary_api_key: Some(SECONDARY_KEY.to_string()),
        ..Config::default()
    }
}

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn health_passes_without_credential_or_rate_state() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app.oneshot(get("/actuator/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "UP");
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app
        .oneshot(get("/api/v1/sessions?userId=alice", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Missing API key"}));
}

#[tokio::test]
async fn blank_api_key_counts_as_missing() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app
        .oneshot(get("/api/v1/sessions?userId=alice", Some("   ")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Missing API key"}));
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app
        .oneshot(get("/api/v1/sessions?userId=alice", Some("wrong")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Invalid API key"}));
}

#[tokio::test]
async fn primary_and_secondary_keys_are_accepted() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    for key in [PRIMARY_KEY, SECONDARY_KEY] {
        let response = app
            .clone()
            .oneshot(get("/api/v1/sessions?userId=alice", Some(key)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "key {key} rejected");
    }
}

#[tokio::test]
async fn unset_primary_key_fails_closed() {
    let config = Config {
        primary_api_key: None,
        secondary_api_key: Some(SECONDARY_KEY.to_string()),
        ..Config::default()
    };
    let (_dir, _state, app) = test_app(config).await;

    // Even the configured secondary is rejected without a primary.
    let response = app
        .clone()
        .oneshot(get("/api/v1/sessions?userId=alice", Some(SECONDARY_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Invalid API key"}));

    // Public endpoints stay reachable.
    let response = app.oneshot(get("/actuator/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn over_quota_key_gets_429_with_retry_after() {
    let config = Config {
        rate_limit_per_minute: 3,
        ..secured_config()
    };
    let (_dir, _state, app) = test_app(config).await;

    for i in 0..3 {
        let response = app
            .clone()
            .oneshot(get("/api/v1/sessions?userId=alice", Some(PRIMARY_KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {i} throttled early");
    }

    // Fourth request in the same window: denied.
    let response = app
        .clone()
        .oneshot(get("/api/v1/sessions?userId=alice", Some(PRIMARY_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("Retry-After").unwrap().to_str().unwrap(),
        "60"
    );
    let body = json_body(response).await;
    assert_eq!(body["type"], "https://ragchat.api/errors/rate-limit-exceeded");
    assert_eq!(body["title"], "Rate Limit Exceeded");
    assert_eq!(body["status"], 429);
    assert_eq!(body["detail"], "API key rate limit exceeded");
    assert_eq!(body["retryAfter"], 60);

    // A different key in the same window is unaffected.
    let response = app
        .oneshot(get("/api/v1/sessions?userId=alice", Some(SECONDARY_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reset_all_restores_a_drained_key() {
    let config = Config {
        rate_limit_per_minute: 1,
        ..secured_config()
    };
    let (_dir, state, app) = test_app(config).await;

    let ok = app
        .clone()
        .oneshot(get("/api/v1/sessions?userId=alice", Some(PRIMARY_KEY)))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let denied = app
        .clone()
        .oneshot(get("/api/v1/sessions?userId=alice", Some(PRIMARY_KEY)))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    state.rate_limiter.reset_all();

    let restored = app
        .oneshot(get("/api/v1/sessions?userId=alice", Some(PRIMARY_KEY)))
        .await
        .unwrap();
    assert_eq!(restored.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_credentials_are_not_metered() {
    let config = Config {
        rate_limit_per_minute: 1,
        ..secured_config()
    };
    let (_dir, state, app) = test_app(config).await;

    // All of these fail auth, but none may consume rate-limit state.
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(get("/api/v1/sessions?userId=alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(state.rate_limiter.tracked_keys(), 0);
}

#[tokio::test]
async fn rate_limit_denial_precedes_key_validation() {
    let config = Config {
        rate_limit_per_minute: 1,
        ..secured_config()
    };
    let (_dir, _state, app) = test_app(config).await;

    // An invalid key consumes its own bucket...
    let response = app
        .clone()
        .oneshot(get("/api/v1/sessions?userId=alice", Some("guess-1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // ...and once drained, the caller hears 429 before any key check.
    let response = app
        .oneshot(get("/api/v1/sessions?userId=alice", Some("guess-1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// Error normalization
// =============================================================================

#[tokio::test]
async fn not_found_renders_problem_shape_with_instance() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app
        .oneshot(get("/api/v1/sessions/999", Some(PRIMARY_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["type"], "https://ragchat.api/errors/not-found");
    assert_eq!(body["title"], "Resource Not Found");
    assert_eq!(body["status"], 404);
    assert_eq!(body["detail"], "Session with id 999 not found");
    assert_eq!(body["instance"], "/api/v1/sessions/999");
    assert!(body.get("retryAfter").is_none());
    assert!(body.get("timestamp").is_some());
}

#[tokio::test]
async fn validation_failure_aggregates_field_errors() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let response = app
        .oneshot(post_json("/api/v1/sessions", Some(PRIMARY_KEY), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["type"], "https://ragchat.api/errors/validation-error");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Validation failed: {"), "got: {detail}");
    assert!(detail.contains("userId=User ID is required"));
}

#[tokio::test]
async fn duplicate_session_title_renders_conflict() {
    let (_dir, _state, app) = test_app(secured_config()).await;
    let payload = json!({"userId": "alice", "title": "Notes"});

    let created = app
        .clone()
        .oneshot(post_json("/api/v1/sessions", Some(PRIMARY_KEY), payload.clone()))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post_json("/api/v1/sessions", Some(PRIMARY_KEY), payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["type"], "https://ragchat.api/errors/conflict");
    assert_eq!(body["title"], "Resource Conflict");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("same user ID and title"), "got: {detail}");
    assert_eq!(body["instance"], "/api/v1/sessions");
}

#[tokio::test]
async fn invalid_sender_is_caught_by_validation() {
    let (_dir, _state, app) = test_app(secured_config()).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions",
            Some(PRIMARY_KEY),
            json!({"userId": "alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let session_id = json_body(created).await["id"].as_i64().unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            Some(PRIMARY_KEY),
            json!({"sender": "robot", "content": "hi"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("Sender must be one of: user, assistant, system"));
}
