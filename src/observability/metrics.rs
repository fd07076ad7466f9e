//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): served requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `proxy_cache_writes_total` (counter): background writes by result
//! - `proxy_cache_entries` (gauge): entries held by the in-memory store
//! - `proxy_upstream_duration_seconds` (histogram): upstream exchange latency
//! - `proxy_upstream_errors_total` (counter): network failures reaching upstream

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("proxy_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_write(result: &'static str) {
    counter!("proxy_cache_writes_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}

pub fn record_upstream(status: Option<u16>, start: Instant) {
    histogram!("proxy_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
    if status.is_none() {
        counter!("proxy_upstream_errors_total").increment(1);
    }
}
