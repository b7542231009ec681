//! HTTP response shapes produced by the executor and the rejection paths.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hyper::ext::ReasonPhrase;
use serde::{Deserialize, Serialize};

/// Non-standard status returned when the caller went away before completion.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Response envelope: every successful output is returned as `{"data": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload<T> {
    pub data: T,
}

impl<T> Payload<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Request envelope accepted by handlers as `Json<RequestPayload<T>>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload<T> {
    pub data: T,
}

impl<T> RequestPayload<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Result of running an operation through the HTTP executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome<T> {
    /// Success without output: 200 and an empty body.
    Empty,
    /// Success with output: 200 and `{"data": …}`.
    Payload(T),
    /// Failure: the translated status and its description.
    Status { status: StatusCode, message: String },
}

impl<T> HttpOutcome<T> {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty | Self::Payload(_) => StatusCode::OK,
            Self::Status { status, .. } => *status,
        }
    }
}

impl<T: Serialize> IntoResponse for HttpOutcome<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Empty => StatusCode::OK.into_response(),
            Self::Payload(data) => (StatusCode::OK, Json(Payload::new(data))).into_response(),
            Self::Status { status, message } => status_response(status, &message),
        }
    }
}

/// 499 Client Closed Request.
#[must_use]
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Status-only response: `message` becomes both the HTTP/1 reason phrase and
/// a `text/plain` body.
#[must_use]
pub fn status_response(status: StatusCode, message: &str) -> Response {
    let mut response = (status, message.to_owned()).into_response();
    with_reason(&mut response, message);
    response
}

/// Status response whose body is empty; the message travels only in the
/// reason phrase.
#[must_use]
pub fn bare_status_response(status: StatusCode, message: &str) -> Response {
    let mut response = status.into_response();
    with_reason(&mut response, message);
    response
}

fn with_reason(response: &mut Response, message: &str) {
    if message.is_empty() {
        return;
    }
    match ReasonPhrase::try_from(message.as_bytes()) {
        Ok(reason) => {
            response.extensions_mut().insert(reason);
        }
        Err(_) => tracing::trace!(message, "message is not a valid reason phrase"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn empty_success_has_no_body() {
        let response = HttpOutcome::<()>::Empty.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn payload_is_wrapped_in_data() {
        let response = HttpOutcome::Payload(vec![1, 2, 3]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"data":[1,2,3]}"#);
    }

    #[tokio::test]
    async fn status_outcome_carries_reason_and_body() {
        let response = HttpOutcome::<()>::Status {
            status: StatusCode::NOT_FOUND,
            message: "User 42 not found".to_owned(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"User 42 not found");
        assert_eq!(body_string(response).await, "User 42 not found");
    }

    #[tokio::test]
    async fn bare_status_keeps_body_empty() {
        let response = bare_status_response(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ReasonPhrase>().is_some());
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn client_closed_request_is_499() {
        assert_eq!(client_closed_request().as_u16(), 499);
    }

    #[test]
    fn request_payload_deserializes_envelope() {
        let payload: RequestPayload<String> =
            serde_json::from_str(r#"{"data":"hello"}"#).unwrap();
        assert_eq!(payload.into_inner(), "hello");
    }
}
