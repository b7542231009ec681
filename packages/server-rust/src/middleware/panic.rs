//! Outermost boundary for unhandled failures.
//!
//! Panics escaping a handler are caught by `tower-http`'s `CatchPanicLayer`
//! and converted into a 500 (HTTP) or `Internal` (RPC) response. The panic
//! message is always logged and reaches the caller only in verbose mode.

use std::any::Any;

use axum::body::Body;
use http::Response;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tracing::error;

use crate::error::GatewayError;
use crate::rpc::status::status_response;

/// Best-effort text of a panic payload.
fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}

pub(crate) fn internal_failure(payload: &(dyn Any + Send), verbose: bool) -> GatewayError {
    let detail = panic_detail(payload);
    error!(detail = %detail, "unhandled failure while processing request");
    GatewayError::InternalFailure {
        detail: verbose.then_some(detail),
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Builds the 500 response for a panicking HTTP handler.
#[derive(Debug, Clone, Copy)]
pub struct HttpFailureResponder {
    verbose: bool,
}

impl ResponseForPanic for HttpFailureResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        internal_failure(&*err, self.verbose).into_http_response()
    }
}

/// Panic boundary for the HTTP surface.
#[must_use]
pub fn http_panic_layer(verbose: bool) -> CatchPanicLayer<HttpFailureResponder> {
    CatchPanicLayer::custom(HttpFailureResponder { verbose })
}

// ---------------------------------------------------------------------------
// RPC
// ---------------------------------------------------------------------------

/// Builds the trailers-only `Internal` response for a panicking RPC handler.
#[derive(Debug, Clone, Copy)]
pub struct RpcFailureResponder {
    verbose: bool,
}

impl ResponseForPanic for RpcFailureResponder {
    type ResponseBody = String;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<String> {
        status_response(&internal_failure(&*err, self.verbose).to_rpc_status())
    }
}

/// Panic boundary for the RPC surface.
#[must_use]
pub fn rpc_panic_layer(verbose: bool) -> CatchPanicLayer<RpcFailureResponder> {
    CatchPanicLayer::custom(RpcFailureResponder { verbose })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
