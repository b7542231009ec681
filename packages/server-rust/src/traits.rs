use std::net::IpAddr;
use std::time::SystemTime;

use async_trait::async_trait;
use gatekeeper_core::ApiClient;
use http::{Extensions, HeaderMap};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Enablement state of a service and one of its operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enablement {
    pub service_enabled: bool,
    pub operation_enabled: bool,
}

/// Outcome of an authorization lookup for one key.
///
/// `client` may be present even when `authorized` is false: the key is known
/// but not allowed to call the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    pub client: Option<ApiClient>,
}

/// External authority answering enablement and authorization questions.
///
/// `Err` means the authority itself failed (infrastructure), never a
/// negative answer.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Whether `service` and its `operation` are currently enabled.
    async fn enablement(
        &self,
        service: &str,
        operation: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Enablement>;

    /// Whether `key` may call `operation` on `service`.
    async fn authorize(
        &self,
        key: Uuid,
        service: &str,
        operation: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AuthorizationDecision>;
}

/// Who is making a request, as far as admission control is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requester {
    Anonymous,
    ApiClient { key: Uuid },
}

/// Classifies the requester of an inbound call.
pub trait RequestIdentifier: Send + Sync {
    fn requester(&self, headers: &HeaderMap, extensions: &Extensions) -> Requester;
}

/// External throttling manager owning the recent-request record per
/// (requester, action) pair.
pub trait ThrottlingManager: Send + Sync {
    fn is_allowed(
        &self,
        requester: &Requester,
        metadata: &HeaderMap,
        origin: Option<IpAddr>,
        action: &str,
        now: SystemTime,
    ) -> bool;
}

/// Maintenance-mode check run before any other gate.
pub trait MaintenanceVerifier: Send + Sync {
    fn is_verified(&self, headers: &HeaderMap) -> bool;
}
