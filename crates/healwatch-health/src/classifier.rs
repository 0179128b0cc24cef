//! Threshold-based anomaly classifier.
//!
//! Rules are evaluated first-match in a fixed order; several conditions can
//! hold at once but only the first one produces a verdict.

use healwatch_types::{AnomalyReport, FailureType, HealthSnapshot, Severity};

/// Response latency above which a `latency_spike` is reported.
pub const LATENCY_THRESHOLD_MS: u64 = 2000;

/// Error rate above which a `dependency_failure` is reported.
pub const ERROR_RATE_THRESHOLD_PERCENT: f64 = 5.0;

/// Memory usage above which a `memory_leak` is reported.
pub const MEMORY_THRESHOLD_MB: f64 = 200.0;

/// Map a snapshot to at most one anomaly verdict for `service`.
pub fn classify(service: &str, snapshot: &HealthSnapshot) -> Option<AnomalyReport> {
    if snapshot.is_unreachable() {
        return Some(
            AnomalyReport::new(
                FailureType::ServiceDown,
                Severity::Critical,
                format!(
                    "{} is unreachable (no response after {}ms)",
                    service, snapshot.response_time_ms
                ),
            )
            .with_service(service)
            .with_evidence("status_code", snapshot.status_code)
            .with_evidence("response_time_ms", snapshot.response_time_ms),
        );
    }

    if snapshot.status_code == 503 {
        return Some(
            AnomalyReport::new(
                FailureType::ServiceDown,
                Severity::High,
                format!("{} returned HTTP 503 Service Unavailable", service),
            )
            .with_service(service)
            .with_evidence("status_code", snapshot.status_code),
        );
    }

    if snapshot.response_time_ms > LATENCY_THRESHOLD_MS {
        return Some(
            AnomalyReport::new(
                FailureType::LatencySpike,
                Severity::High,
                format!(
                    "Response latency {}ms exceeds {}ms threshold",
                    snapshot.response_time_ms, LATENCY_THRESHOLD_MS
                ),
            )
            .with_service(service)
            .with_evidence("response_time_ms", snapshot.response_time_ms)
            .with_evidence("p99_latency_ms", snapshot.metrics.p99_latency_ms),
        );
    }

    if snapshot.metrics.error_rate_percent > ERROR_RATE_THRESHOLD_PERCENT {
        return Some(
            AnomalyReport::new(
                FailureType::DependencyFailure,
                Severity::High,
                format!(
                    "Error rate {:.1}% exceeds {}% threshold",
                    snapshot.metrics.error_rate_percent, ERROR_RATE_THRESHOLD_PERCENT
                ),
            )
            .with_service(service)
            .with_evidence("error_rate_percent", snapshot.metrics.error_rate_percent)
            .with_evidence("request_count", snapshot.metrics.request_count),
        );
    }

    if snapshot.metrics.memory_usage_mb > MEMORY_THRESHOLD_MB {
        return Some(
            AnomalyReport::new(
                FailureType::MemoryLeak,
                Severity::Medium,
                format!(
                    "Memory usage {:.0}MB exceeds {}MB threshold",
                    snapshot.metrics.memory_usage_mb, MEMORY_THRESHOLD_MB
                ),
            )
            .with_service(service)
            .with_evidence("memory_usage_mb", snapshot.metrics.memory_usage_mb)
            .with_evidence("restart_count", snapshot.metrics.restart_count),
        );
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "demo-app";

    #[test]
    fn test_unreachable_wins_over_everything() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.service_healthy = false;
        snapshot.status_code = 0;
        snapshot.response_time_ms = 50;
        snapshot.metrics.error_rate_percent = 90.0;
        snapshot.metrics.memory_usage_mb = 900.0;

        let report = classify(SERVICE, &snapshot).unwrap();
        assert_eq!(report.failure_type, FailureType::ServiceDown);
        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.affected_services, vec![SERVICE.to_string()]);
        assert_eq!(report.evidence["status_code"], 0);
    }

    #[test]
    fn test_503_is_high_service_down() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.status_code = 503;
        snapshot.response_time_ms = 5000;

        let report = classify(SERVICE, &snapshot).unwrap();
        assert_eq!(report.failure_type, FailureType::ServiceDown);
        assert_eq!(report.severity, Severity::High);
    }

    #[test]
    fn test_latency_precedes_error_rate() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.response_time_ms = 2001;
        snapshot.metrics.error_rate_percent = 10.0;

        let report = classify(SERVICE, &snapshot).unwrap();
        assert_eq!(report.failure_type, FailureType::LatencySpike);
        assert_eq!(report.severity, Severity::High);
    }

    #[test]
    fn test_error_rate_precedes_memory() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.metrics.error_rate_percent = 5.5;
        snapshot.metrics.memory_usage_mb = 250.0;

        let report = classify(SERVICE, &snapshot).unwrap();
        assert_eq!(report.failure_type, FailureType::DependencyFailure);
        assert_eq!(report.description, "Error rate 5.5% exceeds 5% threshold");
    }

    #[test]
    fn test_memory_leak_is_medium() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.metrics.memory_usage_mb = 250.0;

        let report = classify(SERVICE, &snapshot).unwrap();
        assert_eq!(report.failure_type, FailureType::MemoryLeak);
        assert_eq!(report.severity, Severity::Medium);
        assert_eq!(report.evidence["memory_usage_mb"], 250.0);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut snapshot = HealthSnapshot::healthy();
        snapshot.response_time_ms = LATENCY_THRESHOLD_MS;
        snapshot.metrics.error_rate_percent = ERROR_RATE_THRESHOLD_PERCENT;
        snapshot.metrics.memory_usage_mb = MEMORY_THRESHOLD_MB;

        assert!(classify(SERVICE, &snapshot).is_none());
    }

    #[test]
    fn test_healthy_snapshot_has_no_anomaly() {
        assert!(classify(SERVICE, &HealthSnapshot::healthy()).is_none());
    }
}
