//! Prometheus metrics for application observability.
//!
//! Exported on a dedicated listener when `METRICS_PORT` is non-zero. Without
//! an installed recorder every `record_*` call is a no-op.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `voice_auth_denied_total` - Access Gate denials (label: reason)
//! - `voice_rate_limit_decisions_total` - Admission Limiter decisions (label: decision)
//! - `voice_upstream_requests_total` - Provider calls (labels: provider, outcome)
//!
//! ## Histograms
//! - `voice_upstream_duration_seconds` - Provider call latency (label: provider)
//!
//! ## Gauges
//! - `voice_rate_limit_tracked_identities` - Identities holding an active window

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_DENIED_TOTAL: &str = "voice_auth_denied_total";
    pub const RATE_LIMIT_DECISIONS_TOTAL: &str = "voice_rate_limit_decisions_total";
    pub const UPSTREAM_REQUESTS_TOTAL: &str = "voice_upstream_requests_total";
    pub const UPSTREAM_DURATION_SECONDS: &str = "voice_upstream_duration_seconds";
    pub const RATE_LIMIT_TRACKED_IDENTITIES: &str = "voice_rate_limit_tracked_identities";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (e.g. port in use
/// or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_DENIED_TOTAL,
        "Requests rejected by the API key gate"
    );
    describe_counter!(
        names::RATE_LIMIT_DECISIONS_TOTAL,
        "Admission decisions made by the rate limiter"
    );
    describe_counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "Calls made to upstream providers"
    );
    describe_histogram!(
        names::UPSTREAM_DURATION_SECONDS,
        "Latency of upstream provider calls in seconds"
    );
    describe_gauge!(
        names::RATE_LIMIT_TRACKED_IDENTITIES,
        "Identities currently holding a rate limit window"
    );

    info!(addr = %metrics_addr, "Prometheus metrics exporter started");
    Ok(())
}

pub fn record_auth_denied(reason: &'static str) {
    counter!(names::AUTH_DENIED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_rate_limit_decision(allowed: bool) {
    let decision = if allowed { "allowed" } else { "denied" };
    counter!(names::RATE_LIMIT_DECISIONS_TOTAL, "decision" => decision).increment(1);
}

/// Record one upstream call. `outcome` is "success", "status" or "error".
pub fn record_upstream_request(provider: &'static str, outcome: &'static str, duration_secs: f64) {
    counter!(names::UPSTREAM_REQUESTS_TOTAL, "provider" => provider, "outcome" => outcome)
        .increment(1);
    histogram!(names::UPSTREAM_DURATION_SECONDS, "provider" => provider).record(duration_secs);
}

pub fn set_tracked_identities(count: usize) {
    gauge!(names::RATE_LIMIT_TRACKED_IDENTITIES).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_auth_denied("missing_key");
        record_rate_limit_decision(false);
        record_upstream_request("search", "success", 0.12);
        set_tracked_identities(3);
    }
}
