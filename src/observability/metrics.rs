//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxier_requests_total` (counter): requests by engine, route, status
//! - `proxier_request_duration_seconds` (histogram): latency by engine, route
//! - `proxier_active_connections` (gauge): current inbound connection count

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::EngineKind;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(engine: EngineKind, route: &str, status: StatusCode, started: Instant) {
    counter!(
        "proxier_requests_total",
        "engine" => engine.as_str(),
        "route" => route.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);

    histogram!(
        "proxier_request_duration_seconds",
        "engine" => engine.as_str(),
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn connection_opened() {
    gauge!("proxier_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("proxier_active_connections").decrement(1.0);
}
