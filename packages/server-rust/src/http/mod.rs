//! HTTP surface: executor, per-route gate, middleware stack and response
//! envelopes.

pub mod executor;
pub mod gate;
pub mod pipeline;
pub mod response;

pub use executor::HttpOperationExecutor;
pub use gate::HttpGateLayer;
pub use pipeline::{build_http_layers, HttpLayers};
pub use response::{HttpOutcome, Payload, RequestPayload};
