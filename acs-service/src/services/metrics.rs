//! Metrics for acs-service.
//!
//! Counters are emitted through the `metrics` facade and rendered by the
//! Prometheus exporter installed in `main`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Only the binary calls this; tests run
/// against the no-op recorder.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics already initialized"))
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one dispatcher operation.
pub fn record_operation(
    vendor: &'static str,
    operation: &'static str,
    outcome: &'static str,
    seconds: f64,
) {
    counter!(
        "acs_operations_total",
        "vendor" => vendor,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "acs_operation_duration_seconds",
        "vendor" => vendor,
        "operation" => operation,
        "outcome" => outcome
    )
    .record(seconds);
}

/// Record a best-effort provisioning step that failed after the personnel
/// record was created.
pub fn record_partial_provisioning(vendor: &'static str, step: &'static str) {
    counter!(
        "acs_partial_provisioning_total",
        "vendor" => vendor,
        "step" => step
    )
    .increment(1);
}

/// Record a vendor session login attempt.
pub fn record_login(vendor: &'static str, outcome: &'static str) {
    counter!("acs_logins_total", "vendor" => vendor, "outcome" => outcome).increment(1);
}
