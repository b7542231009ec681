//! Maintenance-mode constraint: requests the verifier does not recognise are
//! turned away with an empty 503 before any other gate runs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use http::{Request, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::traits::MaintenanceVerifier;

// ---------------------------------------------------------------------------
// MaintenanceLayer
// ---------------------------------------------------------------------------

/// Tower layer consulting an optional [`MaintenanceVerifier`].
///
/// Without a verifier every request passes.
#[derive(Clone, Default)]
pub struct MaintenanceLayer {
    verifier: Option<Arc<dyn MaintenanceVerifier>>,
}

impl MaintenanceLayer {
    #[must_use]
    pub fn new(verifier: Option<Arc<dyn MaintenanceVerifier>>) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for MaintenanceLayer {
    type Service = MaintenanceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MaintenanceService {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// MaintenanceService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MaintenanceService<S> {
    inner: S,
    verifier: Option<Arc<dyn MaintenanceVerifier>>,
}

impl<S, B> Service<Request<B>> for MaintenanceService<S>
where
    S: Service<Request<B>, Response = Response> + Send,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        if let Some(verifier) = &self.verifier {
            if !verifier.is_verified(req.headers()) {
                debug!(path = %req.uri().path(), "rejected during maintenance");
                return Box::pin(async { Ok(StatusCode::SERVICE_UNAVAILABLE.into_response()) });
            }
        }
        Box::pin(self.inner.call(req))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::body::{to_bytes, Body};
    use http::HeaderMap;
    use tower::{service_fn, ServiceExt};

    use super::*;

    struct HeaderVerifier;

    impl MaintenanceVerifier for HeaderVerifier {
        fn is_verified(&self, headers: &HeaderMap) -> bool {
            headers.contains_key("x-maintenance-pass")
        }
    }

    async fn ok(_req: Request<Body>) -> Result<Response, Infallible> {
        Ok(StatusCode::OK.into_response())
    }

    #[tokio::test]
    async fn unverified_request_gets_empty_503() {
        let svc = MaintenanceLayer::new(Some(Arc::new(HeaderVerifier))).layer(service_fn(ok));
        let response = svc
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn verified_request_passes() {
        let svc = MaintenanceLayer::new(Some(Arc::new(HeaderVerifier))).layer(service_fn(ok));
        let request = Request::builder()
            .uri("/")
            .header("x-maintenance-pass", "1")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_verifier_lets_everything_through() {
        let svc = MaintenanceLayer::default().layer(service_fn(ok));
        let response = svc
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
