//! gRPC status responses built at the HTTP layer.
//!
//! Rejections produced before a call reaches its tonic service are sent as
//! trailers-only responses: HTTP 200 with `grpc-status` and `grpc-message`
//! in the headers and an empty body.

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use tonic::Status;
use tracing::warn;

/// Trailers-only response carrying `status`.
#[must_use]
pub fn status_response<B: Default>(status: &Status) -> Response<B> {
    let mut response = Response::new(B::default());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/grpc"));
    if let Err(err) = status.add_header(response.headers_mut()) {
        warn!(code = ?status.code(), error = %err, "status could not be encoded as headers");
        response
            .headers_mut()
            .insert("grpc-status", HeaderValue::from(i32::from(status.code())));
    }
    response
}
