//! Admission control: asks the throttling manager whether to let a call in.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::ConnectInfo;
use gatekeeper_core::ApiClient;
use http::{Extensions, HeaderMap};
use tonic::transport::server::TcpConnectInfo;
use tracing::debug;

use crate::error::GatewayError;
use crate::traits::{RequestIdentifier, Requester, ThrottlingManager};

/// Classifies requests by the client the gateway attached, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientRequestIdentifier;

impl RequestIdentifier for ClientRequestIdentifier {
    fn requester(&self, _headers: &HeaderMap, extensions: &Extensions) -> Requester {
        match extensions.get::<ApiClient>() {
            Some(client) => Requester::ApiClient { key: client.key },
            None => Requester::Anonymous,
        }
    }
}

/// Rejects requests the throttling manager does not admit.
///
/// Stateless apart from its ports; the manager owns the request history.
#[derive(Clone)]
pub struct AdmissionFilter {
    manager: Arc<dyn ThrottlingManager>,
    identifier: Arc<dyn RequestIdentifier>,
}

impl AdmissionFilter {
    #[must_use]
    pub fn new(manager: Arc<dyn ThrottlingManager>, identifier: Arc<dyn RequestIdentifier>) -> Self {
        Self {
            manager,
            identifier,
        }
    }

    /// Checks one request for `action` (the operation name).
    ///
    /// # Errors
    ///
    /// [`GatewayError::RateLimited`] when the manager refuses the request.
    pub fn check(
        &self,
        headers: &HeaderMap,
        extensions: &Extensions,
        action: &str,
    ) -> Result<(), GatewayError> {
        let requester = self.identifier.requester(headers, extensions);
        let origin = origin_address(headers, extensions);
        if self
            .manager
            .is_allowed(&requester, headers, origin, action, SystemTime::now())
        {
            return Ok(());
        }
        debug!(action, ?requester, ?origin, "request throttled");
        Err(GatewayError::RateLimited)
    }
}

/// Caller address: first `X-Forwarded-For` entry, else the socket peer.
#[must_use]
pub fn origin_address(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip());
    }
    extensions
        .get::<TcpConnectInfo>()
        .and_then(TcpConnectInfo::remote_addr)
        .map(|addr| addr.ip())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
