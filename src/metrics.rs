use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use reqwest::{Method, StatusCode};
use std::time::Duration;

pub const PROBE_REQUESTS_TOTAL: &str = "probe_requests_total";
pub const PROBE_REQUEST_DURATION_SECONDS: &str = "probe_request_duration_seconds";

// Records one probe round trip. `status` is `None` when the request never
// got a response. Requests sent without the Authorization header get their
// own series so they never mix with the checked scenarios.
pub fn record_probe(
    method: &Method,
    authenticated: bool,
    status: Option<StatusCode>,
    elapsed: Duration,
) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.as_u16().to_string());
    let labels = [
        ("method", method.as_str().to_string()),
        ("authenticated", authenticated.to_string()),
        ("status", status),
    ];

    counter!(PROBE_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(
        PROBE_REQUEST_DURATION_SECONDS,
        "method" => method.as_str().to_string(),
        "authenticated" => authenticated.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Installs a global Prometheus recorder with buckets suited to request
/// latencies and returns the handle used to render the exposition text.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(PROBE_REQUEST_DURATION_SECONDS.to_string()),
            EXPONENTIAL_SECONDS,
        )
        .context("invalid histogram buckets")?
        .install_recorder()
        .context("installing Prometheus recorder failed")
}
