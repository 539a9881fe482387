//! Request correlation and timing logs.
//!
//! Every non-exempt request gets a short random correlation id, carried in a
//! request-scoped tracing span for the duration of the call. One line is
//! logged at entry (method, path, query, caller-supplied user id) and one at
//! exit (status, elapsed milliseconds). A failure escaping the downstream
//! chain is logged with its elapsed time and re-raised unchanged - this
//! filter never swallows or translates errors.
//!
//! The span is dropped when the wrapped future completes, so no correlation
//! state outlives its request or leaks into another one sharing the worker.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::paths::matches_any;
use super::SKIP_LOGGING_PATHS;

/// Length of the generated correlation identifier.
const REQUEST_ID_LENGTH: usize = 8;

/// Generate a short hex correlation id.
fn generate_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(REQUEST_ID_LENGTH);
    id
}

/// Pull a query parameter value out of a raw query string.
fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Correlation logging layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Correlation logging service wrapper.
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display,
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
        let mut inner = self.inner.clone();

        let path = req.uri().path().to_owned();
        if matches_any(&path, SKIP_LOGGING_PATHS) {
            // Exempt: no id, no timing, no logs.
            return Box::pin(async move { inner.call(req).await });
        }

        let request_id = generate_request_id();
        let method = req.method().clone();
        let query = req.uri().query().map(str::to_owned);
        let user_id = query
            .as_deref()
            .and_then(|q| query_param(q, "userId"))
            .map(str::to_owned);

        let span = info_span!("request", request_id = %request_id);

        Box::pin(
            async move {
                info!(
                    method = %method,
                    path = %path,
                    query = query.as_deref().unwrap_or("none"),
                    user_id = user_id.as_deref().unwrap_or("none"),
                    "Incoming request"
                );

                let start = Instant::now();
                match inner.call(req).await {
                    Ok(response) => {
                        info!(
                            status = response.status().as_u16(),
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Outgoing response"
                        );
                        Ok(response)
                    }
                    Err(e) => {
                        error!(
                            duration_ms = start.elapsed().as_millis() as u64,
                            error = %e,
                            "Request processing failed"
                        );
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}
