use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

/// Order in which the admission filter and the authorization gateway run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PipelineOrder {
    /// Admission control, then authorization.
    #[default]
    AdmissionFirst,
    /// Authorization, then admission control. The throttling manager sees
    /// the resolved client.
    AuthorizationFirst,
}

/// Log output format for [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Per-service settings shared by both transports.
///
/// Every field can be given as a flag or through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(about = "Gatekeeper service settings")]
pub struct ServiceSettings {
    /// Name of this service as known by the authority.
    #[arg(long, env = "SERVICE_NAME", default_value = "Unknown")]
    pub service_name: String,
    /// Expose internal failure detail to callers.
    #[arg(
        long = "verbose-errors",
        env = "VERBOSE_ERRORS_ENABLED",
        action = ArgAction::Set,
        default_value_t = false
    )]
    pub verbose_errors_enabled: bool,
    /// `tracing` filter directive, e.g. `info` or `gatekeeper_server=debug`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    /// Port of the Prometheus scrape listener. Disabled when unset.
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
    #[arg(long, env = "PIPELINE_ORDER", value_enum, default_value_t = PipelineOrder::AdmissionFirst)]
    pub pipeline_order: PipelineOrder,
    /// Requests still running after this long have their cancellation token fired.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,
    /// Items buffered between a streaming operation and its consumer.
    #[arg(long, env = "STREAM_BUFFER", default_value_t = 32)]
    pub stream_buffer: usize,
}

impl ServiceSettings {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_name: "Unknown".to_string(),
            verbose_errors_enabled: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: None,
            pipeline_order: PipelineOrder::AdmissionFirst,
            request_timeout_ms: 30_000,
            stream_buffer: 32,
        }
    }
}
