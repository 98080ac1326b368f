//! Prometheus metrics for monitoring the bracket server.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener when
//! `METRICS_BIND` is set. Without an installed exporter every recording call
//! is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts by method, route and status
//! - **Bracket Metrics**: Brackets generated, results recorded, byes resolved
//! - **Error Metrics**: Engine errors by kind

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment generated brackets counter and record the field size.
pub fn brackets_generated_total(competitors: usize) {
    metrics::counter!("brackets_generated_total").increment(1);
    metrics::histogram!("bracket_competitors").record(competitors as f64);
}

/// Increment recorded results counter, labelled by round.
pub fn results_recorded_total(round: &str) {
    metrics::counter!("results_recorded_total",
        "round" => round.to_string()
    )
    .increment(1);
}

/// Increment finalized tournaments counter.
pub fn tournaments_finalized_total() {
    metrics::counter!("tournaments_finalized_total").increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Increment engine errors counter.
pub fn bracket_errors_total(kind: &'static str) {
    metrics::counter!("bracket_errors_total", "kind" => kind).increment(1);
}
