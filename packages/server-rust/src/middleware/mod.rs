//! Tower middleware shared by both transports.

pub mod cancellation;
pub mod maintenance;
pub mod metrics;
pub mod panic;

pub use cancellation::{request_token, CancellationLayer};
pub use maintenance::MaintenanceLayer;
pub use metrics::ResponseMetricsLayer;
