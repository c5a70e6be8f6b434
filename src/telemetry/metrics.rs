//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "portal_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "portal_http_request_duration_seconds";
pub const HTTP_REQUESTS_IN_FLIGHT: &str = "portal_http_requests_in_flight";
pub const REQUESTS_CREATED_TOTAL: &str = "portal_requests_created_total";
pub const APPROVAL_DECISIONS_TOTAL: &str = "portal_approval_decisions_total";
pub const APPROVAL_CONFLICTS_TOTAL: &str = "portal_approval_conflicts_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    // Seconds, with sub-millisecond buckets for fast endpoints
    let buckets = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)?
        .install_recorder()
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines are
/// present from startup, not just after first use.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        HTTP_REQUESTS_IN_FLIGHT,
        "Number of HTTP requests currently being processed"
    );

    describe_counter!(REQUESTS_CREATED_TOTAL, "Access requests filed");
    describe_counter!(
        APPROVAL_DECISIONS_TOTAL,
        "Approve/reject decisions applied, by decision"
    );
    describe_counter!(
        APPROVAL_CONFLICTS_TOTAL,
        "Decisions that lost a race with a concurrent decision"
    );

    counter!(REQUESTS_CREATED_TOTAL).absolute(0);
    counter!(APPROVAL_DECISIONS_TOTAL, "decision" => "approve").absolute(0);
    counter!(APPROVAL_DECISIONS_TOTAL, "decision" => "reject").absolute(0);
    counter!(APPROVAL_CONFLICTS_TOTAL).absolute(0);
    gauge!(HTTP_REQUESTS_IN_FLIGHT).set(0.0);
}
