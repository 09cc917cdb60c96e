//! Prometheus metrics for webhook deliveries and site builds.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a webhook received event.
pub fn webhook_received(event_type: &str) {
    counter!("pages_webhooks_received_total", "event" => event_type.to_string()).increment(1);
}

/// Record a finished build.
pub fn build_finished(status: &str) {
    counter!("pages_builds_total", "status" => status.to_string()).increment(1);
}

/// Record build duration.
pub fn build_duration(duration_ms: u64) {
    histogram!("pages_build_duration_ms").record(duration_ms as f64);
}
