//! Health probing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name used for the monitored service when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "demo-app";

/// Timeout applied to the reachability probe and each metric query.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the [`HealthProber`](crate::HealthProber).
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Name reported as the affected service.
    pub service_name: String,

    /// Upper bound for every sub-probe.
    pub probe_timeout: Duration,

    /// Scalar queries sent to the monitoring backend.
    pub queries: MetricQueries,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            queries: MetricQueries::default(),
        }
    }
}

/// The five scalar time-series queries behind a snapshot's metrics bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQueries {
    /// Error rate in percent.
    pub error_rate: String,

    /// p99 latency in milliseconds.
    pub p99_latency: String,

    /// Memory usage in megabytes.
    pub memory_usage: String,

    /// Process restart count.
    pub restart_count: String,

    /// Total request count.
    pub request_count: String,
}

impl Default for MetricQueries {
    fn default() -> Self {
        Self {
            error_rate: r#"sum(rate(http_requests_total{status=~"5.."}[1m])) / sum(rate(http_requests_total[1m])) * 100"#.to_string(),
            p99_latency: "histogram_quantile(0.99, sum(rate(http_request_duration_seconds_bucket[1m])) by (le)) * 1000".to_string(),
            memory_usage: "process_resident_memory_bytes / 1024 / 1024".to_string(),
            restart_count: "sum(changes(process_start_time_seconds[1h]))".to_string(),
            request_count: "sum(http_requests_total)".to_string(),
        }
    }
}
