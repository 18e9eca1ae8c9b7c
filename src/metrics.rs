//! Prometheus metrics.
//!
//! Recording goes through the `metrics` facade; the exporter is installed once
//! per process and rendered by the `/metrics` handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; only the
/// first call installs anything.
pub fn init() {
    PROMETHEUS.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    });
}

/// Render the current metrics in Prometheus text format.
pub fn render() -> String {
    PROMETHEUS
        .get()
        .and_then(|handle| handle.as_ref())
        .map(|handle| handle.render())
        .unwrap_or_default()
}

pub fn record_request(endpoint: &'static str, status: u16) {
    ::metrics::counter!(
        "substitch_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    ::metrics::histogram!("substitch_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_fetch() {
    ::metrics::counter!("substitch_upstream_fetches_total").increment(1);
}

pub fn record_origin_error() {
    ::metrics::counter!("substitch_origin_errors_total").increment(1);
}

pub fn set_active_sessions(count: usize) {
    ::metrics::gauge!("substitch_active_sessions").set(count as f64);
}
