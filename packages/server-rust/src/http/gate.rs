//! Per-route gate for the HTTP surface.
//!
//! Applied with `route_layer` so each route carries the descriptor it was
//! registered with. Rejections are answered here; admitted requests reach the
//! handler with the resolved [`gatekeeper_core::ApiClient`] in their
//! extensions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::Response;
use http::Request;
use tower::{Layer, Service};

use crate::service::gate::RequestGate;
use crate::service::operation::OperationDescriptor;

// ---------------------------------------------------------------------------
// HttpGateLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HttpGateLayer {
    gate: Arc<RequestGate>,
    operation: Arc<OperationDescriptor>,
}

impl HttpGateLayer {
    #[must_use]
    pub fn new(gate: Arc<RequestGate>, operation: Arc<OperationDescriptor>) -> Self {
        Self { gate, operation }
    }
}

impl<S> Layer<S> for HttpGateLayer {
    type Service = HttpGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpGateService {
            inner,
            gate: Arc::clone(&self.gate),
            operation: Arc::clone(&self.operation),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpGateService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HttpGateService<S> {
    inner: S,
    gate: Arc<RequestGate>,
    operation: Arc<OperationDescriptor>,
}

impl<S, B> Service<Request<B>> for HttpGateService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);
        let operation = Arc::clone(&self.operation);

        Box::pin(async move {
            if let Err(rejection) = gate.admit(&operation, &mut req).await {
                return Ok(rejection.into_http_response());
            }
            inner.call(req).await
        })
    }
}
