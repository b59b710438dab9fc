//! Metrics collection and exposition.
//!
//! # Metrics
//! - `votifier_connections_accepted_total` (counter)
//! - `votifier_connections_failed_total` (counter, `reason`)
//! - `votifier_votes_received_total` (counter)
//! - `votifier_consumer_failures_total` (counter, `consumer`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted() {
    metrics::counter!("votifier_connections_accepted_total").increment(1);
}

pub fn record_connection_failed(reason: &'static str) {
    metrics::counter!("votifier_connections_failed_total", "reason" => reason).increment(1);
}

/// Unlabelled; the service name is sender-controlled.
pub fn record_vote_received() {
    metrics::counter!("votifier_votes_received_total").increment(1);
}

pub fn record_consumer_failure(consumer: &str) {
    metrics::counter!("votifier_consumer_failures_total", "consumer" => consumer.to_owned())
        .increment(1);
}
