//! Per-request cancellation.
//!
//! Every request gets a [`CancellationToken`] in its extensions. The token is
//! cancelled when the caller goes away (the response future is dropped) or
//! when the request outlives its deadline. On the deadline the inner service
//! keeps running so the executor can report the cancelled outcome itself.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use http::{Extensions, Request};
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service};
use tracing::debug;

/// Token stored in `extensions`, or a fresh one that is never cancelled.
#[must_use]
pub fn request_token(extensions: &Extensions) -> CancellationToken {
    extensions
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// CancellationLayer
// ---------------------------------------------------------------------------

/// Tower layer attaching a cancellation token with a deadline to each request.
#[derive(Debug, Clone, Copy)]
pub struct CancellationLayer {
    timeout: Duration,
}

impl CancellationLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for CancellationLayer {
    type Service = CancellationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CancellationService {
            inner,
            timeout: self.timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// CancellationService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CancellationService<S> {
    inner: S,
    timeout: Duration,
}

impl<S, B> Service<Request<B>> for CancellationService<S>
where
    S: Service<Request<B>> + Send,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let token = CancellationToken::new();
        req.extensions_mut().insert(token.clone());
        let timeout = self.timeout;
        let fut = self.inner.call(req);

        Box::pin(async move {
            // Fires if this future is dropped before the response is ready.
            let guard = token.clone().drop_guard();
            tokio::pin!(fut);

            let result = tokio::select! {
                result = &mut fut => result,
                () = tokio::time::sleep(timeout) => {
                    debug!(timeout_ms = timeout.as_millis(), "request deadline elapsed, cancelling");
                    token.cancel();
                    fut.await
                }
            };

            guard.disarm();
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
