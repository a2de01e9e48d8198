//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency by method, route
//!
//! # Design Decisions
//! - Exporter is opt-in; recording without it costs nothing
//! - Labels are bounded: `route` is a configured label, `ns` or `default`,
//!   never a client-supplied host

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Histogram buckets for registry traffic: fast manifest hits up to slow blob pulls.
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
///
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LATENCY_BUCKETS)?
        .install()?;

    describe_counter!("proxy_requests_total", "Total number of proxied requests");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Request duration in seconds"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Standard methods keep their name; extension methods share one label.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let method = method_label(method);
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
    ];
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_label_is_bounded() {
        assert_eq!(method_label("PUT"), "PUT");
        assert_eq!(method_label("PROPFIND"), "OTHER");
        assert_eq!(method_label("get"), "OTHER");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_request("GET", 200, "default", Instant::now());
    }
}
