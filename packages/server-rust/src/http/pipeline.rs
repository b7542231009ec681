//! HTTP middleware stack applied to every route.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::HeaderName;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::cancellation::CancellationLayer;
use crate::middleware::maintenance::MaintenanceLayer;
use crate::middleware::metrics::ResponseMetricsLayer;
use crate::middleware::panic::{http_panic_layer, HttpFailureResponder};
use crate::traits::MaintenanceVerifier;

/// The composed layer type produced by [`build_http_layers`], innermost
/// first in the nesting.
pub type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        CancellationLayer,
        Stack<
            MaintenanceLayer,
            Stack<
                CatchPanicLayer<HttpFailureResponder>,
                Stack<
                    ResponseMetricsLayer,
                    Stack<
                        TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                        Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
                    >,
                >,
            >,
        >,
    >,
>;

/// Builds the router-wide HTTP stack.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id`
/// 2. `Tracing` -- request/response spans
/// 3. `ResponseMetrics` -- response counter and 2xx duration histogram
/// 4. `CatchPanic` -- unhandled failures become 500
/// 5. `Maintenance` -- empty 503 for unverified requests
/// 6. `Cancellation` -- per-request token with the request deadline
/// 7. `PropagateRequestId` -- copies `X-Request-Id` to the response
///
/// Authorization and admission control run per route, inside this stack.
#[must_use]
pub fn build_http_layers(
    verbose_errors: bool,
    request_timeout: Duration,
    maintenance: Option<Arc<dyn MaintenanceVerifier>>,
) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(ResponseMetricsLayer)
        .layer(http_panic_layer(verbose_errors))
        .layer(MaintenanceLayer::new(maintenance))
        .layer(CancellationLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}
