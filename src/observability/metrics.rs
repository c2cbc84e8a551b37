//! Metrics collection and exposition.
//!
//! # Metrics
//! - `feeder_skus_total` (counter): submitted lines by outcome
//! - `feeder_connections_total` (counter): connections by admission result
//! - `feeder_active_connections` (gauge): connections holding a slot
//! - `feeder_shutdowns_total` (counter): shutdowns by cause
//! - `feeder_persisted_total` (counter): SKUs newly written to the backend

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

fn describe() {
    describe_counter!("feeder_skus_total", "Submitted lines by outcome");
    describe_counter!("feeder_connections_total", "Connections by admission result");
    describe_gauge!("feeder_active_connections", "Connections holding an admission slot");
    describe_counter!("feeder_shutdowns_total", "Shutdowns by cause");
    describe_counter!("feeder_persisted_total", "SKUs newly written to the backend");
}

pub fn record_sku(outcome: &'static str) {
    counter!("feeder_skus_total", "outcome" => outcome).increment(1);
}

pub fn record_connection(result: &'static str) {
    counter!("feeder_connections_total", "result" => result).increment(1);
}

pub fn record_connection_opened() {
    gauge!("feeder_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("feeder_active_connections").decrement(1.0);
}

pub fn record_shutdown(cause: &'static str) {
    counter!("feeder_shutdowns_total", "cause" => cause).increment(1);
}

pub fn record_persisted(inserted: u64) {
    counter!("feeder_persisted_total").increment(inserted);
}
