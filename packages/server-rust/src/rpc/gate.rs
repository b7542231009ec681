//! Gate for the RPC surface.
//!
//! Wraps the whole tonic router. The operation is resolved from the method
//! path (`/package.Service/Method`) against the catalog; rejections are sent
//! as trailers-only gRPC responses without reaching the service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};

use super::status::status_response;
use crate::service::catalog::OperationCatalog;
use crate::service::gate::RequestGate;

// ---------------------------------------------------------------------------
// RpcGateLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RpcGateLayer {
    gate: Arc<RequestGate>,
    catalog: Arc<OperationCatalog>,
}

impl RpcGateLayer {
    #[must_use]
    pub fn new(gate: Arc<RequestGate>, catalog: Arc<OperationCatalog>) -> Self {
        Self { gate, catalog }
    }
}

impl<S> Layer<S> for RpcGateLayer {
    type Service = RpcGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RpcGateService {
            inner,
            gate: Arc::clone(&self.gate),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

// ---------------------------------------------------------------------------
// RpcGateService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RpcGateService<S> {
    inner: S,
    gate: Arc<RequestGate>,
    catalog: Arc<OperationCatalog>,
}

impl<S, B, ResBody> Service<Request<B>> for RpcGateService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);
        let operation = self.catalog.resolve_rpc_path(req.uri().path());

        Box::pin(async move {
            if let Err(rejection) = gate.admit(&operation, &mut req).await {
                return Ok(status_response(&rejection.to_rpc_status()));
            }
            inner.call(req).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
