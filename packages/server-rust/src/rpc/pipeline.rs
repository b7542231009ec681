//! RPC middleware stack, applied with `tonic::transport::Server::layer`.
//!
//! Outermost to innermost: tracing, panic boundary, cancellation, gate.

use std::sync::Arc;
use std::time::Duration;

use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::classify::{GrpcErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

use super::gate::RpcGateLayer;
use crate::middleware::cancellation::CancellationLayer;
use crate::middleware::panic::{rpc_panic_layer, RpcFailureResponder};
use crate::service::catalog::OperationCatalog;
use crate::service::gate::RequestGate;

/// The composed layer type produced by [`build_rpc_layers`].
pub type RpcLayers = Stack<
    RpcGateLayer,
    Stack<
        CancellationLayer,
        Stack<
            CatchPanicLayer<RpcFailureResponder>,
            Stack<TraceLayer<SharedClassifier<GrpcErrorsAsFailures>>, Identity>,
        >,
    >,
>;

#[must_use]
pub fn build_rpc_layers(
    verbose_errors: bool,
    request_timeout: Duration,
    gate: Arc<RequestGate>,
    catalog: Arc<OperationCatalog>,
) -> RpcLayers {
    ServiceBuilder::new()
        .layer(TraceLayer::new_for_grpc())
        .layer(rpc_panic_layer(verbose_errors))
        .layer(CancellationLayer::new(request_timeout))
        .layer(RpcGateLayer::new(gate, catalog))
        .into_inner()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::task::{Context, Poll};

    use axum::body::Body as RequestBody;
    use gatekeeper_core::ApiClient;
    use http::{HeaderValue, Request, Response};
    use tonic::body::BoxBody;
    use tonic::codec::ProstCodec;
    use tonic::codegen::{Body, BoxFuture, StdError};
    use tonic::server::{Grpc, UnaryService};
    use tower::{Layer, Service, ServiceExt};

    use super::*;
    use crate::rpc::status::status_response;
    use crate::service::api_key::RpcApiKeyParser;
    use crate::service::config::PipelineOrder;
    use crate::service::gateway::ApiKeyGateway;
    use crate::service::monitor::MonitorCache;
    use crate::test_support::{FakeAuthority, TEST_KEY};
    use crate::traits::Authority;

    const GET_USER: &str = "/users.v1.UserService/GetUser";
    const EXPLODE: &str = "/users.v1.UserService/Explode";

    /// `GetUser` taking and returning `google.protobuf.Empty`. Replies with
    /// the attached client's note in `x-client` metadata.
    struct GetUser;

    impl UnaryService<()> for GetUser {
        type Response = ();
        type Future = BoxFuture<tonic::Response<()>, tonic::Status>;

        fn call(&mut self, request: tonic::Request<()>) -> Self::Future {
            let note = request
                .extensions()
                .get::<ApiClient>()
                .map(|client| client.note.clone());
            Box::pin(async move {
                let mut response = tonic::Response::new(());
                if let Some(note) = note {
                    response.metadata_mut().insert("x-client", note.parse().unwrap());
                }
                Ok(response)
            })
        }
    }

    #[allow(clippy::unused_async)]
    async fn explode() -> Result<Response<BoxBody>, Infallible> {
        panic!("user table corrupted")
    }

    /// Server for `users.v1.UserService`, routed the way generated tonic
    /// servers route.
    #[derive(Clone)]
    struct UserServiceServer;

    impl<B> Service<Request<B>> for UserServiceServer
    where
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = Response<BoxBody>;
        type Error = Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<B>) -> Self::Future {
            match req.uri().path() {
                GET_USER => Box::pin(async move {
                    let mut grpc = Grpc::new(ProstCodec::<(), ()>::default());
                    Ok(grpc.unary(GetUser, req).await)
                }),
                EXPLODE => Box::pin(explode()),
                _ => Box::pin(async {
                    Ok(status_response(&tonic::Status::unimplemented("unknown method")))
                }),
            }
        }
    }

    fn layers(authority: FakeAuthority, verbose: bool) -> RpcLayers {
        let gateway = ApiKeyGateway::new(
            "Users",
            Arc::new(authority) as Arc<dyn Authority>,
            Arc::new(MonitorCache::new()),
            Arc::new(RpcApiKeyParser),
            verbose,
        );
        build_rpc_layers(
            verbose,
            Duration::from_secs(5),
            Arc::new(RequestGate::new(PipelineOrder::AdmissionFirst, None, gateway)),
            Arc::new(OperationCatalog::new()),
        )
    }

    /// A unary call carrying one empty gRPC message frame.
    fn call(path: &str, key: Option<&'static str>) -> Request<RequestBody> {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/grpc")
            .header("te", "trailers")
            .body(RequestBody::from(vec![0u8, 0, 0, 0, 0]))
            .unwrap();
        if let Some(key) = key {
            req.headers_mut()
                .insert("roblox-api-key", HeaderValue::from_static(key));
        }
        req
    }

    #[tokio::test]
    async fn authorized_call_reaches_tonic_service() {
        let svc = layers(FakeAuthority::allowing("Partner-7"), false).layer(UserServiceServer);

        let response = svc.oneshot(call(GET_USER, Some(TEST_KEY))).await.unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(!response.headers().contains_key("grpc-status"));
        assert_eq!(response.headers()["x-client"], "Partner-7");
    }

    #[tokio::test]
    async fn missing_key_is_rejected_before_the_service() {
        let svc = layers(FakeAuthority::allowing("Partner-7"), false).layer(UserServiceServer);

        let response = svc.oneshot(call(GET_USER, None)).await.unwrap();

        assert_eq!(response.headers()["grpc-status"], "16");
        assert_eq!(response.headers()["content-type"], "application/grpc");
        assert!(!response.headers().contains_key("x-client"));
    }

    #[tokio::test]
    async fn denied_key_is_permission_denied() {
        let svc = layers(FakeAuthority::denying(Some("Partner-7")), false).layer(UserServiceServer);

        let response = svc.oneshot(call(GET_USER, Some(TEST_KEY))).await.unwrap();

        assert_eq!(response.headers()["grpc-status"], "7");
        assert!(!response.headers().contains_key("x-client"));
    }

    #[tokio::test]
    async fn panicking_method_is_internal() {
        let svc = layers(FakeAuthority::allowing("Partner-7"), false).layer(UserServiceServer);

        let response = svc.oneshot(call(EXPLODE, Some(TEST_KEY))).await.unwrap();

        assert_eq!(response.headers()["grpc-status"], "13");
        assert!(!response.headers().contains_key("x-client"));
    }
}
