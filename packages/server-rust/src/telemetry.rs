//! Logging and metrics exporter setup.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::middleware::metrics::{HTTP_SERVER_REQUEST_DURATION_SECONDS, HTTP_SERVER_RESPONSE_TOTAL};
use crate::service::config::{LogFormat, ServiceSettings};
use crate::service::monitor::{AUTHORIZED_API_KEYS, UNAUTHORIZED_API_KEYS};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("tracing subscriber already installed: {0}")]
    Subscriber(#[from] TryInitError),
    #[error("metrics exporter: {0}")]
    Metrics(#[from] BuildError),
}

/// Installs the global `tracing` subscriber described by `settings`.
///
/// # Errors
///
/// Fails on an unparseable `log_level` or when a subscriber is already set.
pub fn init_tracing(settings: &ServiceSettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.log_level)?;
    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Text => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}

/// Installs the Prometheus recorder with a scrape listener on `port` and
/// registers descriptions for the metrics this crate emits.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Fails when a recorder is already installed or the listener cannot be set up.
pub fn install_metrics_exporter(port: u16) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()?;
    describe_metrics();
    tracing::info!(port, "Prometheus metrics listener installed");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        UNAUTHORIZED_API_KEYS,
        "Requests rejected for a missing, unknown or unauthorized API key"
    );
    describe_counter!(AUTHORIZED_API_KEYS, "Requests admitted with an authorized API key");
    describe_counter!(HTTP_SERVER_RESPONSE_TOTAL, "HTTP responses by method, endpoint and status");
    describe_histogram!(
        HTTP_SERVER_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of successful HTTP requests"
    );
}

/// Logging, plus the metrics exporter when `metrics_port` is set.
///
/// # Errors
///
/// See [`init_tracing`] and [`install_metrics_exporter`].
pub fn init(settings: &ServiceSettings) -> Result<(), TelemetryError> {
    init_tracing(settings)?;
    if let Some(port) = settings.metrics_port {
        install_metrics_exporter(port)?;
    }
    Ok(())
}
