//! Per-API-key rate limiting with interval-refill token buckets.
//!
//! # Algorithm
//!
//! Each API key owns a bucket of `capacity` tokens. A bucket snaps back to
//! full capacity once per fixed 60-second window - there is no smooth
//! per-second trickle, so a caller who drains the bucket waits for the next
//! window boundary. Buckets are created lazily on a key's first request and
//! live for the process lifetime (or until [`KeyedRateLimiter::reset_all`]).
//!
//! # Concurrency
//!
//! The registry is a `DashMap`; its entry API makes lookup-or-create atomic,
//! so two racing requests for a new key always land on the same bucket.
//! Token consumption holds a per-bucket mutex: decisions are linearizable per
//! key, the count can never go negative, and unrelated keys do not contend.
//!
//! # Scope
//!
//! Requests without an `X-API-Key` header are not metered; exempt paths skip
//! this filter entirely. Denials return 429 with `Retry-After: 60` and a
//! minimal problem body.

use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::warn;

use super::paths::matches_any;
use super::{API_KEY_HEADER, SKIP_LOGGING_PATHS};
use crate::error::{ErrorCode, ProblemResponse, RETRY_AFTER_SECONDS};

/// Length of the refill window.
const REFILL_WINDOW: Duration = Duration::from_secs(60);

/// Remaining capacity for one API key.
struct Bucket {
    tokens: u32,
    window_start: Instant,
}

/// Registry of per-key token buckets.
pub struct KeyedRateLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
    capacity: u32,
    window: Duration,
}

impl KeyedRateLimiter {
    /// Create a limiter granting `capacity` tokens per key per minute.
    pub fn new(capacity: u32) -> Self {
        Self::with_window(capacity, REFILL_WINDOW)
    }

    /// Create a limiter with a custom refill window (used by tests).
    pub fn with_window(capacity: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            window,
        }
    }

    /// Try to consume one token for `key`.
    ///
    /// Returns `true` when a token was consumed, `false` when the bucket for
    /// this key is empty for the current window.
    pub fn acquire(&self, key: &str) -> bool {
        // Fast path: existing bucket under a shared map read lock, so keys
        // only contend on their own mutex.
        if let Some(bucket) = self.buckets.get(key) {
            return self.consume(&bucket);
        }

        // First use of this key: the entry API makes lookup-or-create atomic,
        // so racing requests always land on the same bucket.
        let entry = self.buckets.entry(key.to_owned()).or_insert_with(|| {
            Mutex::new(Bucket {
                tokens: self.capacity,
                window_start: Instant::now(),
            })
        });
        self.consume(&entry)
    }

    fn consume(&self, bucket: &Mutex<Bucket>) -> bool {
        // A poisoned lock only means another thread panicked mid-decision;
        // the bucket state itself is a pair of plain integers, still usable.
        let mut bucket = match bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let elapsed = bucket.window_start.elapsed();
        if elapsed >= self.window {
            // Full replenish; advance by whole windows so the boundary stays fixed.
            let windows = elapsed.as_nanos() / self.window.as_nanos().max(1);
            bucket.window_start += self.window * windows as u32;
            bucket.tokens = self.capacity;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Discard every bucket, restoring full capacity for all keys.
    pub fn reset_all(&self) {
        self.buckets.clear();
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limiting layer for the Tower middleware stack.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<KeyedRateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<KeyedRateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<KeyedRateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if matches_any(path, SKIP_LOGGING_PATHS) {
                return inner.call(req).await;
            }

            // Absent or blank credentials are not metered; authentication
            // deals with them further down the chain.
            let api_key = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.trim().is_empty());

            if let Some(key) = api_key
                && !limiter.acquire(key)
            {
                warn!(path = %req.uri().path(), "Rate limit exceeded - API key limit");
                return Ok(rate_limited_response("API key rate limit exceeded"));
            }

            inner.call(req).await
        })
    }
}

/// Build the 429 denial emitted by this filter.
///
/// The body carries exactly `{type,title,status,detail,retryAfter}` - no
/// instance or timestamp, unlike taxonomy-normalized errors.
fn rate_limited_response(detail: &str) -> Response<Body> {
    let body = ProblemResponse::new(ErrorCode::RateLimitExceeded, detail);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", RETRY_AFTER_SECONDS.to_string())],
        axum::Json(body),
    )
        .into_response()
}
