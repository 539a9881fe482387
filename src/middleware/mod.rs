//! HTTP middleware: the request-interception pipeline.
//!
//! Three filters run in a fixed order, each short-circuiting the rest on
//! denial:
//!
//! ```text
//! Request → Request Log → Rate Limit → Auth → (error boundary) → Handler
//!               ↓             ↓          ↓
//!           correlation    429 +      401 JSON
//!           span + timing  Retry-After
//! ```
//!
//! Logging wraps everything so timing and error visibility is total. Rate
//! limiting runs before authentication so credential-guessing floods are
//! throttled before any comparison work, and an over-quota caller learns so
//! even before key validity is checked.
//!
//! Filters are independent and stateless with respect to each other; they
//! communicate only through the request/response objects and the correlation
//! span.

pub mod auth;
pub mod paths;
pub mod rate_limit;
pub mod request_log;

pub use auth::{ApiKeyAuthLayer, ApiKeyPrincipal, ApiKeys};
pub use rate_limit::{KeyedRateLimiter, RateLimitLayer};
pub use request_log::RequestLogLayer;

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths exempt from authentication.
///
/// Health probes and API documentation stay reachable without a key.
pub const PUBLIC_ENDPOINTS: &[&str] = &[
    "/actuator/health",
    "/actuator/health/**",
    "/swagger-ui/**",
    "/v3/api-docs/**",
    "/swagger-ui.html",
    "/h2-console/**",
];

/// Paths exempt from request logging and rate limiting.
///
/// Deliberately a separate, narrower list than [`PUBLIC_ENDPOINTS`]: all
/// entries are exact matches, so `/actuator/health` is still logged and
/// metered while `/actuator` itself is not. Keep the two lists independent;
/// collapsing them would silently change which paths are throttled.
pub const SKIP_LOGGING_PATHS: &[&str] = &[
    "/actuator",
    "/swagger-ui",
    "/v3/api-docs",
    "/h2-console",
    "/favicon.ico",
];
