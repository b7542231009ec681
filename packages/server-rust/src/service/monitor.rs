//! Per-operation API key counters.
//!
//! One [`PerOperationApiKeyPerformanceMonitor`] exists per operation name for
//! the lifetime of the [`MonitorCache`]. Creation goes through the `DashMap`
//! entry API, which holds the shard lock across the lookup and the insert, so
//! concurrent first accesses observe the same instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Metric name of the unauthorized counter.
pub const UNAUTHORIZED_API_KEYS: &str = "unauthorized_api_keys";
/// Metric name of the authorized counter.
pub const AUTHORIZED_API_KEYS: &str = "authorized_api_keys";

// ---------------------------------------------------------------------------
// PerOperationApiKeyPerformanceMonitor
// ---------------------------------------------------------------------------

/// Authorized/unauthorized counters for one operation.
///
/// Counters only increase. Each increment is mirrored to the `metrics`
/// facade so an installed exporter sees the same values.
pub struct PerOperationApiKeyPerformanceMonitor {
    operation_name: Arc<str>,
    authorized: AtomicU64,
    unauthorized: AtomicU64,
}

impl PerOperationApiKeyPerformanceMonitor {
    fn new(operation_name: &str) -> Self {
        Self {
            operation_name: operation_name.into(),
            authorized: AtomicU64::new(0),
            unauthorized: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    #[must_use]
    pub fn authorized_count(&self) -> u64 {
        self.authorized.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn unauthorized_count(&self) -> u64 {
        self.unauthorized.load(Ordering::Relaxed)
    }

    /// Records a request whose key was accepted.
    pub fn record_authorized(&self, application_name: &str, client_name: &str) {
        self.authorized.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            AUTHORIZED_API_KEYS,
            "operation_name" => self.operation_name.to_string(),
            "application_name" => application_name.to_owned(),
            "client_name" => client_name.to_owned()
        )
        .increment(1);
    }

    /// Records a request whose key was missing, denied, or could not be checked.
    pub fn record_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            UNAUTHORIZED_API_KEYS,
            "operation_name" => self.operation_name.to_string()
        )
        .increment(1);
    }
}

impl std::fmt::Debug for PerOperationApiKeyPerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerOperationApiKeyPerformanceMonitor")
            .field("operation_name", &self.operation_name)
            .field("authorized", &self.authorized_count())
            .field("unauthorized", &self.unauthorized_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MonitorCache
// ---------------------------------------------------------------------------

/// Lazily populated map from operation name to its monitor.
#[derive(Debug, Default)]
pub struct MonitorCache {
    monitors: DashMap<Arc<str>, Arc<PerOperationApiKeyPerformanceMonitor>>,
}

impl MonitorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the monitor for `operation_name`, creating it on first use.
    pub fn get_or_create(&self, operation_name: &str) -> Arc<PerOperationApiKeyPerformanceMonitor> {
        if let Some(existing) = self.monitors.get(operation_name) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .monitors
            .entry(Arc::from(operation_name))
            .or_insert_with(|| Arc::new(PerOperationApiKeyPerformanceMonitor::new(operation_name)));
        Arc::clone(entry.value())
    }

    /// Returns the monitor for `operation_name` without creating it.
    #[must_use]
    pub fn get(&self, operation_name: &str) -> Option<Arc<PerOperationApiKeyPerformanceMonitor>> {
        self.monitors
            .get(operation_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of distinct operations seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
