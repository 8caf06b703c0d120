//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): downstream requests by status
//!   (`client_gone` when the client left before any status line)
//! - `relay_request_duration_seconds` (histogram): time to final outcome
//! - `relay_upstream_fetches_total` (counter): fetch attempts by outcome
//! - `relay_bytes_relayed_total` (counter): body bytes sent downstream
//! - `relay_active_connections` (gauge): current downstream connections

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished downstream request (`200`, `404` or `client_gone`).
pub fn record_request(status: &'static str, start: Instant) {
    ::metrics::counter!("relay_requests_total", "status" => status).increment(1);
    ::metrics::histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one upstream fetch attempt (`ok` or a failure label).
pub fn record_fetch(outcome: &'static str) {
    ::metrics::counter!("relay_upstream_fetches_total", "outcome" => outcome).increment(1);
}

/// Record body bytes delivered downstream.
pub fn record_bytes(bytes: u64) {
    ::metrics::counter!("relay_bytes_relayed_total").increment(bytes);
}

pub fn connection_opened() {
    ::metrics::gauge!("relay_active_connections").increment(1.0);
}

pub fn connection_closed() {
    ::metrics::gauge!("relay_active_connections").decrement(1.0);
}
