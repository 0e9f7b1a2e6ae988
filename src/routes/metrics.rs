//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    metrics::describe_counter!(
        "prism_requests_total",
        "Total number of completion requests processed"
    );
    metrics::describe_histogram!(
        "prism_request_duration_seconds",
        "Completion request duration in seconds"
    );
    metrics::describe_counter!(
        "prism_alias_retries_total",
        "Completion attempts retried through an inference-profile alias"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a completion request
pub fn record_request(status: &str, model: &str, duration_secs: f64) {
    metrics::counter!("prism_requests_total", "status" => status.to_string(), "model" => model.to_string())
        .increment(1);
    metrics::histogram!("prism_request_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // This should not panic
        init_metrics();
    }
}
