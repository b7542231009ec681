//! API key authorization gateway.
//!
//! Runs once per request before the handler. The checks are terminal on the
//! first applicable outcome:
//!
//! 1. anonymous operations pass without touching the authority or the
//!    monitor cache,
//! 2. a disabled service or operation is rejected before the key is read,
//! 3. a missing or malformed key is rejected,
//! 4. the authority decides; faults are logged and surface as a denial
//!    unless verbose errors are enabled,
//! 5. an authorized caller's [`ApiClient`] is handed back for attachment to
//!    the request.

use std::future::Future;
use std::sync::Arc;

use gatekeeper_core::ApiClient;
use http::{Extensions, HeaderMap, Uri};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::api_key::{application_name, ApiKeyParser};
use super::monitor::MonitorCache;
use super::operation::OperationDescriptor;
use crate::error::{GatewayError, UNASSOCIATED_KEY_CLIENT};
use crate::traits::Authority;

/// Client label used for metrics when the authority authorized a key without
/// naming its client.
pub const UNKNOWN_CLIENT_NAME: &str = "Unknown";

/// Outcome of a successful pass through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The operation allows anonymous access; no identity was resolved.
    Anonymous,
    /// The caller's key was authorized.
    Authorized(ApiClient),
}

impl Admission {
    /// Stores the resolved client in `extensions` for handlers to read.
    pub fn attach(self, extensions: &mut Extensions) {
        if let Self::Authorized(client) = self {
            extensions.insert(client);
        }
    }
}

/// The parts of an inbound request the gateway looks at.
#[derive(Debug, Clone, Copy)]
pub struct GatewayRequest<'a> {
    pub operation: &'a OperationDescriptor,
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
    pub cancel: &'a CancellationToken,
}

/// Per-transport authorization gateway.
pub struct ApiKeyGateway {
    service_name: Arc<str>,
    authority: Arc<dyn Authority>,
    monitors: Arc<MonitorCache>,
    parser: Arc<dyn ApiKeyParser>,
    verbose_errors: bool,
}

impl ApiKeyGateway {
    #[must_use]
    pub fn new(
        service_name: impl Into<Arc<str>>,
        authority: Arc<dyn Authority>,
        monitors: Arc<MonitorCache>,
        parser: Arc<dyn ApiKeyParser>,
        verbose_errors: bool,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            authority,
            monitors,
            parser,
            verbose_errors,
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn monitors(&self) -> &Arc<MonitorCache> {
        &self.monitors
    }

    /// Decides whether `request` may reach its operation.
    ///
    /// # Errors
    ///
    /// The [`GatewayError`] to send back instead of running the operation.
    /// [`GatewayError::Cancelled`] when the request's token fired during an
    /// authority lookup; no counter is touched in that case.
    pub async fn authorize(&self, request: GatewayRequest<'_>) -> Result<Admission, GatewayError> {
        let operation = request.operation;
        let service = &*self.service_name;
        let operation_name = operation.name();

        if operation.allow_anonymous {
            trace!(operation = operation_name, "anonymous operation, skipping API key check");
            return Ok(Admission::Anonymous);
        }

        let enablement = race(
            request.cancel,
            self.authority
                .enablement(service, operation_name, request.cancel),
        )
        .await?;
        let enablement = match enablement {
            Ok(enablement) => enablement,
            Err(err) => {
                let detail = format!("{err:#}");
                error!(service, operation = operation_name, error = %detail, "enablement lookup failed");
                return Err(self.fault(detail, || GatewayError::ServiceDisabled {
                    service: service.to_owned(),
                }));
            }
        };
        if !enablement.service_enabled {
            debug!(service, operation = operation_name, "service disabled");
            return Err(GatewayError::ServiceDisabled {
                service: service.to_owned(),
            });
        }
        if !enablement.operation_enabled {
            debug!(service, operation = operation_name, "operation disabled");
            return Err(GatewayError::OperationDisabled {
                service: service.to_owned(),
                operation: operation_name.to_owned(),
            });
        }

        let monitor = self.monitors.get_or_create(operation_name);

        let Some(key) = self.parser.try_parse(request.headers, request.uri) else {
            monitor.record_unauthorized();
            debug!(service, operation = operation_name, "API key missing");
            return Err(GatewayError::KeyMissing {
                service: service.to_owned(),
                operation: operation_name.to_owned(),
            });
        };

        let decision = race(
            request.cancel,
            self.authority
                .authorize(key, service, operation_name, request.cancel),
        )
        .await?;
        let decision = match decision {
            Ok(decision) => decision,
            Err(err) => {
                monitor.record_unauthorized();
                let detail = format!("{err:#}");
                error!(service, operation = operation_name, error = %detail, "authorization lookup failed");
                return Err(self.fault(detail, || {
                    denied(UNASSOCIATED_KEY_CLIENT, service, operation_name)
                }));
            }
        };

        if !decision.authorized {
            monitor.record_unauthorized();
            let client = decision
                .client
                .as_ref()
                .map(|c| c.note.as_str())
                .filter(|note| !note.is_empty())
                .unwrap_or(UNASSOCIATED_KEY_CLIENT);
            debug!(service, operation = operation_name, client, "API key not authorized");
            return Err(denied(client, service, operation_name));
        }

        let client = decision
            .client
            .unwrap_or_else(|| ApiClient::new(key, UNKNOWN_CLIENT_NAME));
        monitor.record_authorized(application_name(request.headers), &client.note);
        trace!(
            service,
            operation = operation_name,
            client = %client.note,
            "API key authorized"
        );
        Ok(Admission::Authorized(client))
    }

    /// Rejection for an authority fault: the detail in verbose mode, the
    /// generic rejection otherwise.
    fn fault(&self, detail: String, generic: impl FnOnce() -> GatewayError) -> GatewayError {
        if self.verbose_errors {
            GatewayError::AuthorityUnavailable { detail }
        } else {
            generic()
        }
    }
}

fn denied(client: &str, service: &str, operation: &str) -> GatewayError {
    GatewayError::AuthorizationDenied {
        client: client.to_owned(),
        service: service.to_owned(),
        operation: operation.to_owned(),
    }
}

/// Awaits `lookup` unless `cancel` fires first.
async fn race<T>(
    cancel: &CancellationToken,
    lookup: impl Future<Output = T>,
) -> Result<T, GatewayError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(GatewayError::Cancelled),
        result = lookup => Ok(result),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
