//! Per-request gate combining admission control and API key authorization in
//! the configured order.

use http::Request;
use tokio_util::sync::CancellationToken;

use super::admission::AdmissionFilter;
use super::config::PipelineOrder;
use super::gateway::{ApiKeyGateway, GatewayRequest};
use super::operation::OperationDescriptor;
use crate::error::GatewayError;
use crate::middleware::cancellation::request_token;

/// Admission filter and gateway, run in [`PipelineOrder`].
///
/// Without a throttling manager only the gateway runs.
pub struct RequestGate {
    order: PipelineOrder,
    admission: Option<AdmissionFilter>,
    gateway: ApiKeyGateway,
}

impl RequestGate {
    #[must_use]
    pub fn new(order: PipelineOrder, admission: Option<AdmissionFilter>, gateway: ApiKeyGateway) -> Self {
        Self {
            order,
            admission,
            gateway,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &ApiKeyGateway {
        &self.gateway
    }

    /// Runs both checks for `operation`. On success an authorized client, if
    /// any, has been attached to the request extensions.
    ///
    /// # Errors
    ///
    /// The first rejection produced by either check.
    pub async fn admit<B>(
        &self,
        operation: &OperationDescriptor,
        request: &mut Request<B>,
    ) -> Result<(), GatewayError> {
        let cancel = request_token(request.extensions());
        match self.order {
            PipelineOrder::AdmissionFirst => {
                self.throttle(operation, request)?;
                self.authorize(operation, request, &cancel).await
            }
            PipelineOrder::AuthorizationFirst => {
                self.authorize(operation, request, &cancel).await?;
                self.throttle(operation, request)
            }
        }
    }

    fn throttle<B>(
        &self,
        operation: &OperationDescriptor,
        request: &Request<B>,
    ) -> Result<(), GatewayError> {
        match &self.admission {
            Some(filter) => filter.check(request.headers(), request.extensions(), operation.name()),
            None => Ok(()),
        }
    }

    async fn authorize<B>(
        &self,
        operation: &OperationDescriptor,
        request: &mut Request<B>,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let headers = request.headers();
        let uri = request.uri();
        let admission = self
            .gateway
            .authorize(GatewayRequest {
                operation,
                headers,
                uri,
                cancel,
            })
            .await?;
        admission.attach(request.extensions_mut());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
