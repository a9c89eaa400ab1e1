//! Prometheus metrics for medical-records-service.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Safe to call more than once; only
/// the first call installs anything.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Counts one record operation by name and outcome (`ok`, `not_found`,
/// `invalid`, `error`).
pub fn record_operation(operation: &'static str, outcome: &'static str) {
    counter!(
        "medical_record_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Counts admin login attempts by outcome.
pub fn record_login(outcome: &'static str) {
    counter!("admin_login_attempts_total", "outcome" => outcome).increment(1);
}
