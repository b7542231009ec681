//! Authorization and admission control, independent of the transport.
//!
//! 1. **Catalog** (`catalog`): access declarations per operation
//! 2. **API key** (`api_key`): key extraction from headers or query
//! 3. **Gateway** (`gateway`): enablement and key authorization against the authority
//! 4. **Admission** (`admission`): throttling decisions per requester
//! 5. **Gate** (`gate`): runs the two checks in the configured order
//! 6. **Monitors** (`monitor`): per-operation authorized/unauthorized counters

pub mod admission;
pub mod api_key;
pub mod catalog;
pub mod config;
pub mod gate;
pub mod gateway;
pub mod monitor;
pub mod operation;

pub use admission::{origin_address, AdmissionFilter, ClientRequestIdentifier};
pub use api_key::{ApiKeyParser, HttpApiKeyParser, RpcApiKeyParser};
pub use catalog::OperationCatalog;
pub use config::{LogFormat, PipelineOrder, ServiceSettings};
pub use gate::RequestGate;
pub use gateway::{Admission, ApiKeyGateway, GatewayRequest};
pub use monitor::{MonitorCache, PerOperationApiKeyPerformanceMonitor};
pub use operation::{Access, OperationDescriptor};
