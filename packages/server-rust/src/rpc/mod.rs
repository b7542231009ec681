//! RPC surface for tonic services.

pub mod executor;
pub mod gate;
pub mod pipeline;
pub mod status;

pub use executor::{call_token, ResponseStream, RpcOperationExecutor};
pub use gate::RpcGateLayer;
pub use pipeline::{build_rpc_layers, RpcLayers};
