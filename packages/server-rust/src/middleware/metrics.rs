//! HTTP response metrics.
//!
//! Counts every response by method, endpoint and status code, and records
//! the duration of successful (2xx) requests. A request whose inner service
//! fails without a response is counted as a 500. The endpoint label is the
//! matched route template so path parameters do not explode cardinality.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::MatchedPath;
use http::{Request, Response, StatusCode};
use tower::{Layer, Service};

/// Counter of responses.
pub const HTTP_SERVER_RESPONSE_TOTAL: &str = "http_server_response_total";
/// Histogram of successful request durations, in seconds.
pub const HTTP_SERVER_REQUEST_DURATION_SECONDS: &str = "http_server_request_duration_seconds";
/// Endpoint label for requests that did not match a route.
pub const UNKNOWN_ENDPOINT: &str = "Unknown";

/// Endpoint label for a request.
#[must_use]
pub fn endpoint_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNKNOWN_ENDPOINT.to_owned(), |path| path.as_str().to_owned())
}

// ---------------------------------------------------------------------------
// ResponseMetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer recording response counters and durations via `metrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMetricsLayer;

impl<S> Layer<S> for ResponseMetricsLayer {
    type Service = ResponseMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseMetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// ResponseMetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ResponseMetricsService<S> {
    inner: S,
}

impl<S, B, ResBody> Service<Request<B>> for ResponseMetricsService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Send,
    S::Future: Send + 'static,
    ResBody: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let method = req.method().to_string();
        let endpoint = endpoint_label(&req);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let start = Instant::now();
            let result = fut.await;

            let status = match &result {
                Ok(response) => response.status(),
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            metrics::counter!(
                HTTP_SERVER_RESPONSE_TOTAL,
                "method" => method.clone(),
                "endpoint" => endpoint.clone(),
                "status_code" => status.as_u16().to_string()
            )
            .increment(1);

            if status.is_success() {
                metrics::histogram!(
                    HTTP_SERVER_REQUEST_DURATION_SECONDS,
                    "method" => method,
                    "endpoint" => endpoint
                )
                .record(start.elapsed().as_secs_f64());
            }

            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
