//! Gatekeeper server: API key authorization, admission control and
//! operation result translation for axum and tonic services.

pub mod error;
pub mod http;
pub mod middleware;
pub mod module;
pub mod rpc;
pub mod service;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use error::GatewayError;
pub use module::{Gatekeeper, GatekeeperBuilder};
pub use service::{Access, OperationCatalog, ServiceSettings};
pub use traits::{
    AuthorizationDecision, Authority, Enablement, MaintenanceVerifier, RequestIdentifier,
    Requester, ThrottlingManager,
};
