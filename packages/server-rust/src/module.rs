//! Gatekeeper context: assembles the shared parts once and hands out the
//! transport layers and executors that use them.
//!
//! There are no process-wide singletons. The monitor cache, the catalog and
//! both gates live here and are shared via `Arc` with every layer built from
//! this context.

use std::sync::Arc;

use axum::http::StatusCode;
use gatekeeper_core::DeclaredStatus;

use crate::http::executor::HttpOperationExecutor;
use crate::http::gate::HttpGateLayer;
use crate::http::pipeline::{build_http_layers, HttpLayers};
use crate::rpc::executor::RpcOperationExecutor;
use crate::rpc::pipeline::{build_rpc_layers, RpcLayers};
use crate::service::admission::{AdmissionFilter, ClientRequestIdentifier};
use crate::service::api_key::{ApiKeyParser, HttpApiKeyParser, RpcApiKeyParser};
use crate::service::catalog::OperationCatalog;
use crate::service::config::ServiceSettings;
use crate::service::gate::RequestGate;
use crate::service::gateway::ApiKeyGateway;
use crate::service::monitor::MonitorCache;
use crate::service::operation::OperationDescriptor;
use crate::traits::{Authority, MaintenanceVerifier, RequestIdentifier, ThrottlingManager};

// ---------------------------------------------------------------------------
// GatekeeperBuilder
// ---------------------------------------------------------------------------

/// Collects the ports and the catalog before the context is frozen.
pub struct GatekeeperBuilder {
    settings: ServiceSettings,
    authority: Arc<dyn Authority>,
    throttling: Option<Arc<dyn ThrottlingManager>>,
    identifier: Arc<dyn RequestIdentifier>,
    maintenance: Option<Arc<dyn MaintenanceVerifier>>,
    catalog: OperationCatalog,
}

impl GatekeeperBuilder {
    /// Enables admission control through `manager`.
    #[must_use]
    pub fn throttling(mut self, manager: Arc<dyn ThrottlingManager>) -> Self {
        self.throttling = Some(manager);
        self
    }

    /// Replaces the default [`ClientRequestIdentifier`].
    #[must_use]
    pub fn request_identifier(mut self, identifier: Arc<dyn RequestIdentifier>) -> Self {
        self.identifier = identifier;
        self
    }

    /// Enables the maintenance constraint on the HTTP surface.
    #[must_use]
    pub fn maintenance(mut self, verifier: Arc<dyn MaintenanceVerifier>) -> Self {
        self.maintenance = Some(verifier);
        self
    }

    /// Uses `catalog` for access declarations.
    #[must_use]
    pub fn catalog(mut self, catalog: OperationCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn build(self) -> Gatekeeper {
        let monitors = Arc::new(MonitorCache::new());
        let admission = self
            .throttling
            .map(|manager| AdmissionFilter::new(manager, Arc::clone(&self.identifier)));

        let gate = |parser: Arc<dyn ApiKeyParser>| {
            let gateway = ApiKeyGateway::new(
                self.settings.service_name.as_str(),
                Arc::clone(&self.authority),
                Arc::clone(&monitors),
                parser,
                self.settings.verbose_errors_enabled,
            );
            Arc::new(RequestGate::new(
                self.settings.pipeline_order,
                admission.clone(),
                gateway,
            ))
        };
        let http_gate = gate(Arc::new(HttpApiKeyParser));
        let rpc_gate = gate(Arc::new(RpcApiKeyParser));

        tracing::info!(
            service = %self.settings.service_name,
            operations = self.catalog.len(),
            pipeline_order = ?self.settings.pipeline_order,
            throttling = admission.is_some(),
            "gatekeeper assembled"
        );

        Gatekeeper {
            settings: Arc::new(self.settings),
            catalog: Arc::new(self.catalog),
            monitors,
            http_gate,
            rpc_gate,
            maintenance: self.maintenance,
        }
    }
}

// ---------------------------------------------------------------------------
// Gatekeeper
// ---------------------------------------------------------------------------

/// Shared authorization context for one service.
pub struct Gatekeeper {
    settings: Arc<ServiceSettings>,
    catalog: Arc<OperationCatalog>,
    monitors: Arc<MonitorCache>,
    http_gate: Arc<RequestGate>,
    rpc_gate: Arc<RequestGate>,
    maintenance: Option<Arc<dyn MaintenanceVerifier>>,
}

impl Gatekeeper {
    #[must_use]
    pub fn builder(settings: ServiceSettings, authority: Arc<dyn Authority>) -> GatekeeperBuilder {
        GatekeeperBuilder {
            settings,
            authority,
            throttling: None,
            identifier: Arc::new(ClientRequestIdentifier),
            maintenance: None,
            catalog: OperationCatalog::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<OperationCatalog> {
        &self.catalog
    }

    #[must_use]
    pub fn monitors(&self) -> &Arc<MonitorCache> {
        &self.monitors
    }

    /// Router-wide HTTP stack; apply with `Router::layer`.
    #[must_use]
    pub fn http_layers(&self) -> HttpLayers {
        build_http_layers(
            self.settings.verbose_errors_enabled,
            self.settings.request_timeout(),
            self.maintenance.clone(),
        )
    }

    /// Per-route gate for the catalog entry `group`/`name`; apply with
    /// `MethodRouter::route_layer`.
    #[must_use]
    pub fn http_gate(&self, group: &str, name: &str) -> HttpGateLayer {
        self.http_gate_for(self.catalog.resolve(group, name))
    }

    /// Per-route gate for an explicit descriptor.
    #[must_use]
    pub fn http_gate_for(&self, operation: Arc<OperationDescriptor>) -> HttpGateLayer {
        HttpGateLayer::new(Arc::clone(&self.http_gate), operation)
    }

    /// RPC stack; apply with `tonic::transport::Server::builder().layer(..)`.
    #[must_use]
    pub fn rpc_layers(&self) -> RpcLayers {
        build_rpc_layers(
            self.settings.verbose_errors_enabled,
            self.settings.request_timeout(),
            Arc::clone(&self.rpc_gate),
            Arc::clone(&self.catalog),
        )
    }

    /// HTTP executor for domain `C`; `overrides` replace declared statuses.
    #[must_use]
    pub fn http_executor<C>(
        &self,
        overrides: impl IntoIterator<Item = (C, StatusCode)>,
    ) -> HttpOperationExecutor<C>
    where
        C: DeclaredStatus<StatusCode>,
    {
        HttpOperationExecutor::declared(overrides)
    }

    /// RPC executor for domain `C`; `overrides` replace declared codes.
    #[must_use]
    pub fn rpc_executor<C>(
        &self,
        overrides: impl IntoIterator<Item = (C, tonic::Code)>,
    ) -> RpcOperationExecutor<C>
    where
        C: DeclaredStatus<tonic::Code>,
    {
        RpcOperationExecutor::declared(overrides, self.settings.stream_buffer)
            .with_verbose_errors(self.settings.verbose_errors_enabled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
