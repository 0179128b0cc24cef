//! Health snapshot of the monitored service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status code recorded when the monitored service could not be reached at all.
pub const UNREACHABLE_STATUS: u16 = 0;

/// Derived metrics gathered from the monitoring backend.
///
/// Every field defaults to zero when its query fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    /// Error rate in percent (0-100).
    pub error_rate_percent: f64,

    /// 99th percentile latency in milliseconds.
    pub p99_latency_ms: f64,

    /// Resident memory in megabytes.
    pub memory_usage_mb: f64,

    /// Number of process restarts observed.
    pub restart_count: f64,

    /// Number of requests served.
    pub request_count: f64,
}

/// Point-in-time view of the monitored service, rebuilt on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Whether the health endpoint answered with a success status.
    pub service_healthy: bool,

    /// HTTP status of the health endpoint, [`UNREACHABLE_STATUS`] when unreachable.
    pub status_code: u16,

    /// Wall-clock latency of the health probe in milliseconds.
    pub response_time_ms: u64,

    /// Inferred health of the service's dependencies.
    pub dependencies_healthy: bool,

    /// Whether the monitoring backend itself is reachable.
    pub platform_healthy: bool,

    /// Scalar metrics from the monitoring backend.
    pub metrics: MetricsBundle,

    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl HealthSnapshot {
    /// A snapshot of a fully healthy service with zeroed metrics.
    pub fn healthy() -> Self {
        Self {
            service_healthy: true,
            status_code: 200,
            response_time_ms: 0,
            dependencies_healthy: true,
            platform_healthy: true,
            metrics: MetricsBundle::default(),
            timestamp: Utc::now(),
        }
    }

    /// Whether the service could not be reached.
    pub fn is_unreachable(&self) -> bool {
        self.status_code == UNREACHABLE_STATUS
    }
}
