//! Rejection taxonomy shared by the HTTP and RPC surfaces.

use axum::http::StatusCode;
use axum::response::Response;
use thiserror::Error;
use tonic::{Code, Status};

use crate::http::response::{bare_status_response, client_closed_request, status_response};
use crate::service::api_key::API_KEY_HEADER;

/// Client label used when a key is not associated with any known client.
pub const UNASSOCIATED_KEY_CLIENT: &str = "API Key was passed but isn't associated with a known client";

/// Why a request was rejected before, or instead of, reaching its operation.
///
/// Domain errors returned by operations never take this path; they go
/// through the status translator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Service ({service}) is disabled.")]
    ServiceDisabled { service: String },

    #[error("Operation ({operation}) is disabled (on service: {service})")]
    OperationDisabled { service: String, operation: String },

    /// Absent and malformed keys are reported alike.
    #[error("API key ({header}) not specified in request to {service} ({operation})", header = API_KEY_HEADER)]
    KeyMissing { service: String, operation: String },

    #[error("Client ({client}) is not authorized for {operation} (on service: {service})")]
    AuthorizationDenied {
        client: String,
        service: String,
        operation: String,
    },

    /// Only produced when verbose errors are enabled; otherwise an authority
    /// fault surfaces as [`GatewayError::AuthorizationDenied`].
    #[error("Authority lookup failed: {detail}")]
    AuthorityUnavailable { detail: String },

    #[error("Too Many Requests")]
    RateLimited,

    #[error("Client Closed Request")]
    Cancelled,

    /// `detail` is `None` unless verbose errors are enabled.
    #[error("Internal Server Error")]
    InternalFailure { detail: Option<String> },
}

impl GatewayError {
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ServiceDisabled { .. } | Self::OperationDisabled { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::KeyMissing { .. } => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            Self::AuthorityUnavailable { .. } | Self::InternalFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Cancelled => client_closed_request(),
        }
    }

    #[must_use]
    pub fn rpc_code(&self) -> Code {
        match self {
            Self::ServiceDisabled { .. } | Self::OperationDisabled { .. } => Code::Unavailable,
            Self::KeyMissing { .. } => Code::Unauthenticated,
            Self::AuthorizationDenied { .. } => Code::PermissionDenied,
            Self::AuthorityUnavailable { .. } | Self::InternalFailure { .. } => Code::Internal,
            Self::RateLimited => Code::ResourceExhausted,
            Self::Cancelled => Code::Cancelled,
        }
    }

    /// Caller-facing description. Internal failures expose their detail only
    /// when one was captured.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InternalFailure {
                detail: Some(detail),
            } => detail.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn into_http_response(self) -> Response {
        match &self {
            Self::InternalFailure { detail: None } => {
                bare_status_response(self.http_status(), &self.to_string())
            }
            _ => status_response(self.http_status(), &self.description()),
        }
    }

    #[must_use]
    pub fn to_rpc_status(&self) -> Status {
        Status::new(self.rpc_code(), self.description())
    }
}

impl From<GatewayError> for Status {
    fn from(error: GatewayError) -> Self {
        error.to_rpc_status()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[test]
    fn messages_name_the_subject() {
        let disabled = GatewayError::ServiceDisabled {
            service: "Users".to_owned(),
        };
        assert_eq!(disabled.to_string(), "Service (Users) is disabled.");

        let op_disabled = GatewayError::OperationDisabled {
            service: "Users".to_owned(),
            operation: "DeleteUser".to_owned(),
        };
        assert_eq!(
            op_disabled.to_string(),
            "Operation (DeleteUser) is disabled (on service: Users)"
        );

        let missing = GatewayError::KeyMissing {
            service: "Users".to_owned(),
            operation: "GetUser".to_owned(),
        };
        assert_eq!(
            missing.to_string(),
            "API key (Roblox-Api-Key) not specified in request to Users (GetUser)"
        );

        let denied = GatewayError::AuthorizationDenied {
            client: "Partner-7".to_owned(),
            service: "Users".to_owned(),
            operation: "GetUser".to_owned(),
        };
        assert_eq!(
            denied.to_string(),
            "Client (Partner-7) is not authorized for GetUser (on service: Users)"
        );
    }

    #[test]
    fn statuses_per_transport() {
        let cases = [
            (
                GatewayError::ServiceDisabled {
                    service: String::new(),
                },
                503,
                Code::Unavailable,
            ),
            (
                GatewayError::KeyMissing {
                    service: String::new(),
                    operation: String::new(),
                },
                401,
                Code::Unauthenticated,
            ),
            (
                GatewayError::AuthorizationDenied {
                    client: String::new(),
                    service: String::new(),
                    operation: String::new(),
                },
                403,
                Code::PermissionDenied,
            ),
            (
                GatewayError::AuthorityUnavailable {
                    detail: String::new(),
                },
                500,
                Code::Internal,
            ),
            (GatewayError::RateLimited, 429, Code::ResourceExhausted),
            (GatewayError::Cancelled, 499, Code::Cancelled),
            (
                GatewayError::InternalFailure { detail: None },
                500,
                Code::Internal,
            ),
        ];

        for (error, http, rpc) in cases {
            assert_eq!(error.http_status().as_u16(), http, "{error:?}");
            assert_eq!(error.rpc_code(), rpc, "{error:?}");
        }
    }

    #[tokio::test]
    async fn internal_failure_hides_detail_unless_captured() {
        let hidden = GatewayError::InternalFailure { detail: None }.into_http_response();
        let body = to_bytes(hidden.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let shown = GatewayError::InternalFailure {
            detail: Some("db pool exhausted".to_owned()),
        };
        assert_eq!(shown.to_rpc_status().message(), "db pool exhausted");
        let body = to_bytes(shown.into_http_response().into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"db pool exhausted");
    }

    #[test]
    fn converts_into_tonic_status() {
        let status: Status = GatewayError::RateLimited.into();
        assert_eq!(status.code(), Code::ResourceExhausted);
        assert_eq!(status.message(), "Too Many Requests");
    }
}
