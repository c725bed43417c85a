//! Metrics collection and exposition.
//!
//! # Metrics
//! - `history_fetch_cycles_total` (counter): completed archive poll cycles
//! - `history_archives_fetched_total` (counter): archives unpacked into the cache
//! - `history_fetch_errors_total` (counter): failures by stage (list, archive, overview)
//! - `history_http_requests_total` (counter): REST requests by route and status

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_fetch_cycle(archives_fetched: usize) {
    counter!("history_fetch_cycles_total").increment(1);
    counter!("history_archives_fetched_total").increment(archives_fetched as u64);
}

pub fn record_fetch_error(stage: &'static str) {
    counter!("history_fetch_errors_total", "stage" => stage).increment(1);
}

pub fn record_request(route: &'static str, status: u16) {
    counter!(
        "history_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}
