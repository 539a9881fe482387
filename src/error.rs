//! Error taxonomy and problem-response normalization.
//!
//! Every failure that escapes a handler is translated exactly once, at the
//! router boundary, into a stable problem shape:
//!
//! ```json
//! {
//!   "type": "https://ragchat.api/errors/not-found",
//!   "title": "Resource Not Found",
//!   "status": 404,
//!   "detail": "Session with id 42 not found",
//!   "instance": "/api/v1/sessions/42",
//!   "timestamp": "2024-01-15T10:30:00Z"
//! }
//! ```
//!
//! `retryAfter` appears if and only if the error kind is rate-limit-exceeded.
//! Unclassified failures are logged with full detail server-side but exposed
//! to the caller only as a generic message - no internal detail leaks.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Seconds a rate-limited caller should wait before retrying.
///
/// Matches the fixed bucket refill window of the rate limiter.
pub const RETRY_AFTER_SECONDS: u64 = 60;

/// Base URI for error type identifiers.
const ERROR_TYPE_BASE: &str = "https://ragchat.api/errors";

// =============================================================================
// Error Codes
// =============================================================================

/// The closed set of error kinds exposed by the API.
///
/// Each kind maps to exactly one `(type URI, title, HTTP status)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ResourceNotFound,
    ValidationError,
    RateLimitExceeded,
    Conflict,
    InternalServerError,
}

impl ErrorCode {
    /// Stable URI identifying this error kind.
    pub fn error_type(&self) -> String {
        format!("{ERROR_TYPE_BASE}/{}", self.slug())
    }

    fn slug(&self) -> &'static str {
        match self {
            ErrorCode::ResourceNotFound => "not-found",
            ErrorCode::ValidationError => "validation-error",
            ErrorCode::RateLimitExceeded => "rate-limit-exceeded",
            ErrorCode::Conflict => "conflict",
            ErrorCode::InternalServerError => "internal-server-error",
        }
    }

    /// Human-readable label for this error kind.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::ResourceNotFound => "Resource Not Found",
            ErrorCode::ValidationError => "Validation Error",
            ErrorCode::RateLimitExceeded => "Rate Limit Exceeded",
            ErrorCode::Conflict => "Resource Conflict",
            ErrorCode::InternalServerError => "Internal Server Error",
        }
    }

    /// HTTP status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// Application Errors
// =============================================================================

/// Application-wide failure signals.
///
/// Handlers and repositories return these; the normalization boundary turns
/// them into [`ProblemResponse`] bodies. `Conflict` carries an already
/// classified, user-facing detail (see [`ConflictClassifier`]), never a raw
/// storage-engine message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl ApiError {
    /// Not-found error for a resource referenced by numeric id.
    pub fn not_found(resource: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{resource} with id {id} not found"))
    }

    /// The error kind this failure maps to.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::NotFound(_) => ErrorCode::ResourceNotFound,
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            ApiError::Conflict(_) => ErrorCode::Conflict,
            ApiError::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    /// The detail string exposed to the caller.
    ///
    /// Internal failures are masked; everything else is user-facing already.
    pub fn public_detail(&self) -> String {
        match self {
            ApiError::Internal(_) => "An unexpected error occurred".to_string(),
            ApiError::NotFound(msg)
            | ApiError::Validation(msg)
            | ApiError::RateLimited(msg)
            | ApiError::Conflict(msg) => msg.clone(),
        }
    }
}

/// Convenience type alias for Results with ApiError.
pub type AppResult<T> = Result<T, ApiError>;

// =============================================================================
// Problem Response
// =============================================================================

/// Normalized failure body.
///
/// `instance` and `timestamp` are set by the normalization boundary;
/// the rate-limit filter emits the body without them, matching the minimal
/// denial shape of that stage.
#[derive(Debug, Serialize)]
pub struct ProblemResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProblemResponse {
    /// Build the body for an error kind and detail, without request context.
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            error_type: code.error_type(),
            title: code.title().to_string(),
            status: code.status().as_u16(),
            detail: detail.into(),
            instance: None,
            retry_after: (code == ErrorCode::RateLimitExceeded).then_some(RETRY_AFTER_SECONDS),
            timestamp: None,
        }
    }

    /// Attach the request path and stamp the body.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self.timestamp = Some(Utc::now());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Denials are operationally informative, not failures of the system;
        // unclassified errors get their full chain logged here and nowhere else.
        match &self {
            ApiError::RateLimited(msg) => tracing::warn!(detail = %msg, "Request rate limited"),
            ApiError::Internal(source) => tracing::error!(error = ?source, "Unexpected error"),
            other => tracing::error!(error = %other, "Request failed"),
        }

        let code = self.code();
        let body = ProblemResponse::new(code, self.public_detail());
        let mut response = (code.status(), axum::Json(body)).into_response();
        // Stashed for the normalization boundary, which re-renders the body
        // with the request path attached.
        response.extensions_mut().insert(NormalizedError {
            code,
            detail: self.public_detail(),
        });
        response
    }
}

/// Marker carried on responses produced from an [`ApiError`].
#[derive(Debug, Clone)]
pub struct NormalizedError {
    pub code: ErrorCode,
    pub detail: String,
}

/// Normalization boundary middleware.
///
/// Catches responses born from an [`ApiError`] and re-renders them with the
/// request path as `instance` and a timestamp. Responses that did not come
/// from the taxonomy (success, filter denials) pass through untouched.
pub async fn normalize_errors(req: Request<Body>, next: Next) -> Response {
    let instance = req.uri().path().to_owned();
    let mut response = next.run(req).await;

    let Some(err) = response.extensions_mut().remove::<NormalizedError>() else {
        return response;
    };

    let body = ProblemResponse::new(err.code, err.detail).with_instance(instance);
    let mut normalized = (err.code.status(), axum::Json(body)).into_response();
    if err.code == ErrorCode::RateLimitExceeded {
        normalized
            .headers_mut()
            .insert("Retry-After", axum::http::HeaderValue::from(RETRY_AFTER_SECONDS));
    }
    normalized
}

// =============================================================================
// Conflict Classification
// =============================================================================

/// Translates raw storage-engine constraint messages into user-facing detail.
///
/// SQLite surfaces constraint violations as free-form text rather than
/// structured codes, so classification is substring matching against known
/// markers. The trait boundary keeps that engine-specific fragility out of
/// the taxonomy: a different storage engine supplies its own implementation.
pub trait ConflictClassifier: Send + Sync {
    fn classify(&self, raw: &str) -> String;
}

/// Classifier for SQLite constraint messages.
///
/// Matches in priority order: uniqueness markers, the sender check
/// constraint, foreign keys, then a generic fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConflictClassifier;

impl ConflictClassifier for SqliteConflictClassifier {
    fn classify(&self, raw: &str) -> String {
        if raw.contains("uk_sessions_user_title")
            || raw.contains("UNIQUE constraint")
            || raw.contains("duplicate key")
        {
            return "A session with the same user ID and title already exists. \
                    Please use a different title or update the existing session."
                .to_string();
        }
        if raw.contains("chk_messages_sender")
            || (raw.contains("CHECK constraint") && raw.contains("sender"))
        {
            return "Invalid sender value. Sender must be one of: 'user', 'assistant', \
                    or 'system' (case-insensitive)."
                .to_string();
        }
        if raw.contains("foreign key") || raw.contains("FOREIGN KEY constraint") {
            return "Referenced resource does not exist".to_string();
        }
        "A resource with the same identifier already exists".to_string()
    }
}

// =============================================================================
// Field Error Aggregation
// =============================================================================

/// Collector for request-shape validation failures.
///
/// All offending fields are reported in one pass, rendered deterministically
/// in first-seen order: `Validation failed: {userId=..., title=...}`.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<(&'static str, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation for `field`. Later violations for the same field
    /// are kept; rendering preserves insertion order.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with an aggregated validation error if anything was recorded.
    pub fn into_result(self) -> AppResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let rendered = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field}={message}"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(ApiError::Validation(format!(
            "Validation failed: {{{rendered}}}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_uris() {
        assert_eq!(
            ErrorCode::ResourceNotFound.error_type(),
            "https://ragchat.api/errors/not-found"
        );
        assert_eq!(
            ErrorCode::RateLimitExceeded.error_type(),
            "https://ragchat.api/errors/rate-limit-exceeded"
        );
        assert_eq!(
            ErrorCode::InternalServerError.error_type(),
            "https://ragchat.api/errors/internal-server-error"
        );
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ErrorCode::ResourceNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::RateLimitExceeded.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let rate_limited = ProblemResponse::new(ErrorCode::RateLimitExceeded, "limit");
        assert_eq!(rate_limited.retry_after, Some(RETRY_AFTER_SECONDS));

        for code in [
            ErrorCode::ResourceNotFound,
            ErrorCode::ValidationError,
            ErrorCode::Conflict,
            ErrorCode::InternalServerError,
        ] {
            assert!(ProblemResponse::new(code, "x").retry_after.is_none());
        }
    }

    #[test]
    fn test_problem_response_serialization_skips_absent_fields() {
        let body = ProblemResponse::new(ErrorCode::Conflict, "duplicate");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["type"], "https://ragchat.api/errors/conflict");
        assert_eq!(json["title"], "Resource Conflict");
        assert_eq!(json["status"], 409);
        assert!(json.get("instance").is_none());
        assert!(json.get("retryAfter").is_none());
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_with_instance_stamps_timestamp() {
        let body =
            ProblemResponse::new(ErrorCode::ResourceNotFound, "gone").with_instance("/api/v1/x");
        assert_eq!(body.instance.as_deref(), Some("/api/v1/x"));
        assert!(body.timestamp.is_some());
    }

    #[test]
    fn test_internal_error_masks_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("connection pool exploded at 0x7f"));
        assert_eq!(err.public_detail(), "An unexpected error occurred");
        assert_eq!(err.code(), ErrorCode::InternalServerError);
    }

    #[test]
    fn test_classifier_unique_violation() {
        let classifier = SqliteConflictClassifier;
        for raw in [
            "UNIQUE constraint failed: sessions.user_id, sessions.title",
            "constraint uk_sessions_user_title violated",
            "ERROR: duplicate key value violates unique constraint",
        ] {
            assert!(
                classifier.classify(raw).contains("same user ID and title"),
                "misclassified: {raw}"
            );
        }
    }

    #[test]
    fn test_classifier_sender_check() {
        let classifier = SqliteConflictClassifier;
        let detail = classifier.classify("CHECK constraint failed: chk_messages_sender");
        assert!(detail.contains("Invalid sender value"));

        let detail = classifier.classify("CHECK constraint failed: sender must be valid");
        assert!(detail.contains("Invalid sender value"));
    }

    #[test]
    fn test_classifier_foreign_key() {
        let classifier = SqliteConflictClassifier;
        let detail = classifier.classify("FOREIGN KEY constraint failed");
        assert_eq!(detail, "Referenced resource does not exist");
    }

    #[test]
    fn test_classifier_priority_order() {
        // A message containing both unique and FK markers classifies as unique.
        let classifier = SqliteConflictClassifier;
        let detail =
            classifier.classify("UNIQUE constraint failed while checking foreign key parent");
        assert!(detail.contains("same user ID and title"));
    }

    #[test]
    fn test_classifier_fallback() {
        let classifier = SqliteConflictClassifier;
        assert_eq!(
            classifier.classify("something inscrutable"),
            "A resource with the same identifier already exists"
        );
    }

    #[test]
    fn test_field_errors_aggregate_in_first_seen_order() {
        let mut errors = FieldErrors::new();
        errors.push("userId", "User ID is required");
        errors.push("title", "Title must not exceed 100 characters");

        let err = errors.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: {userId=User ID is required, \
             title=Title must not exceed 100 characters}"
        );
    }

    #[test]
    fn test_field_errors_empty_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
