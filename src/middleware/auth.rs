//! API key authentication middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: Prevents timing attacks on API key validation
//! - **Fail-closed**: With no primary key configured, every presented
//!   credential is rejected; an unset key never means "authentication disabled"
//! - **Selective protection**: Health and documentation endpoints bypassed
//!
//! Clients present the key in the `X-API-Key` header. Two reference values
//! are accepted - a primary and an optional secondary - so keys can be
//! rotated without downtime.
//!
//! Denials short-circuit the chain with a minimal machine-readable body:
//! `{"error":"Missing API key"}` or `{"error":"Invalid API key"}`, status 401.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::warn;

use super::paths::matches_any;
use super::{API_KEY_HEADER, PUBLIC_ENDPOINTS};

/// An authenticated caller.
///
/// Constructed only by this filter, only for a credential that matched a
/// configured reference value; holding one is the proof of authentication.
/// The value is immutable and request-scoped: it rides the request
/// extensions and is dropped with them.
#[derive(Debug, Clone)]
pub struct ApiKeyPrincipal {
    credential: Arc<str>,
}

impl ApiKeyPrincipal {
    fn new(credential: &str) -> Self {
        Self {
            credential: Arc::from(credential),
        }
    }

    /// The opaque credential this caller presented.
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Always true; construction only succeeds for valid credentials.
    pub fn is_authenticated(&self) -> bool {
        true
    }
}

/// Accepted API keys, shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    primary: Option<Arc<str>>,
    secondary: Option<Arc<str>>,
}

impl ApiKeys {
    pub fn new(primary: Option<String>, secondary: Option<String>) -> Self {
        Self {
            primary: non_blank(primary),
            secondary: non_blank(secondary),
        }
    }

    /// Check a presented credential against the configured reference values.
    ///
    /// Fail-closed: with no primary key configured nothing validates,
    /// including a would-be secondary match.
    fn is_valid(&self, presented: &str) -> bool {
        let Some(primary) = &self.primary else {
            return false;
        };

        let matches_primary = constant_time_eq(presented, primary);
        let matches_secondary = self
            .secondary
            .as_deref()
            .is_some_and(|secondary| constant_time_eq(presented, secondary));

        matches_primary || matches_secondary
    }
}

/// Treat blank configuration values as unset.
fn non_blank(key: Option<String>) -> Option<Arc<str>> {
    key.filter(|k| !k.trim().is_empty()).map(Arc::from)
}

/// Perform constant-time comparison of two strings.
///
/// Prevents timing attacks that would let an attacker derive the key from
/// response-time differences.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// API key authentication layer.
#[derive(Clone)]
pub struct ApiKeyAuthLayer {
    keys: ApiKeys,
}

impl ApiKeyAuthLayer {
    pub fn new(keys: ApiKeys) -> Self {
        Self { keys }
    }
}

impl<S> Layer<S> for ApiKeyAuthLayer {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            keys: self.keys.clone(),
        }
    }
}

/// API key authentication service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    keys: ApiKeys,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let keys = self.keys.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if matches_any(path, PUBLIC_ENDPOINTS) {
                return inner.call(req).await;
            }

            let presented = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.trim().is_empty());

            let Some(presented) = presented else {
                return Ok(unauthorized_response("Missing API key"));
            };

            if keys.is_valid(presented) {
                let principal = ApiKeyPrincipal::new(presented);
                req.extensions_mut().insert(principal);
                inner.call(req).await
            } else {
                warn!(path = %req.uri().path(), "Authentication failed - Invalid API key");
                Ok(unauthorized_response("Invalid API key"))
            }
        })
    }
}

#[derive(Serialize)]
struct AuthErrorBody<'a> {
    error: &'a str,
}

/// Build an unauthorized (401) response.
fn unauthorized_response(message: &str) -> Response<Body> {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(AuthErrorBody { error: message }),
    )
        .into_response()
}
