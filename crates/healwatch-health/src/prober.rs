//! Health prober.
//!
//! Builds a [`HealthSnapshot`] by running the reachability probe, the
//! platform liveness probe and the five metric queries concurrently. Each
//! sub-probe is bounded by the probe timeout and degrades independently: a
//! failure never cancels its siblings and never fails the snapshot.

use std::sync::Arc;

use chrono::Utc;
use healwatch_bus::EventBus;
use healwatch_types::health::UNREACHABLE_STATUS;
use healwatch_types::{EventType, HealthSnapshot, MetricsBundle};
use serde_json::json;
use tokio::time::{timeout, Instant};
use tracing::{debug, instrument, warn};

use crate::capabilities::{MetricsSource, ServiceProbe};
use crate::config::ProberConfig;

/// Outcome of the reachability sub-probe.
#[derive(Debug, Clone, Copy)]
struct Reachability {
    ok: bool,
    status_code: u16,
    latency_ms: u64,
}

/// Gathers point-in-time health snapshots of the monitored service.
pub struct HealthProber {
    service: Arc<dyn ServiceProbe>,
    metrics: Arc<dyn MetricsSource>,
    bus: Arc<EventBus>,
    config: ProberConfig,
}

impl HealthProber {
    pub fn new(
        service: Arc<dyn ServiceProbe>,
        metrics: Arc<dyn MetricsSource>,
        bus: Arc<EventBus>,
        config: ProberConfig,
    ) -> Self {
        Self {
            service,
            metrics,
            bus,
            config,
        }
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Take a snapshot and publish a `health:healthy` / `health:degraded` summary.
    #[instrument(skip(self), fields(service = %self.config.service_name))]
    pub async fn snapshot(&self) -> HealthSnapshot {
        let queries = &self.config.queries;

        let (reach, platform_healthy, error_rate, p99, memory, restarts, requests) = tokio::join!(
            self.probe_reachability(),
            self.probe_platform(),
            self.query_metric("error_rate", &queries.error_rate),
            self.query_metric("p99_latency", &queries.p99_latency),
            self.query_metric("memory_usage", &queries.memory_usage),
            self.query_metric("restart_count", &queries.restart_count),
            self.query_metric("request_count", &queries.request_count),
        );

        let snapshot = HealthSnapshot {
            service_healthy: reach.ok,
            status_code: reach.status_code,
            response_time_ms: reach.latency_ms,
            dependencies_healthy: reach.status_code != UNREACHABLE_STATUS
                && reach.status_code != 503,
            platform_healthy,
            metrics: MetricsBundle {
                error_rate_percent: error_rate,
                p99_latency_ms: p99,
                memory_usage_mb: memory,
                restart_count: restarts,
                request_count: requests,
            },
            timestamp: Utc::now(),
        };

        let event_type = if snapshot.service_healthy {
            EventType::HealthHealthy
        } else {
            EventType::HealthDegraded
        };
        self.bus.publish(
            event_type,
            json!({
                "service": self.config.service_name,
                "status_code": snapshot.status_code,
                "response_time_ms": snapshot.response_time_ms,
                "platform_healthy": snapshot.platform_healthy,
                "error_rate_percent": snapshot.metrics.error_rate_percent,
                "memory_usage_mb": snapshot.metrics.memory_usage_mb,
            }),
        );

        debug!(
            status_code = snapshot.status_code,
            latency_ms = snapshot.response_time_ms,
            healthy = snapshot.service_healthy,
            "Snapshot taken"
        );
        snapshot
    }

    async fn probe_reachability(&self) -> Reachability {
        let start = Instant::now();
        let result = timeout(self.config.probe_timeout, self.service.check_health()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(response)) => Reachability {
                ok: response.ok,
                status_code: response.status_code,
                latency_ms,
            },
            Ok(Err(e)) => {
                warn!(error = %e, latency_ms, "Health endpoint unreachable");
                Reachability {
                    ok: false,
                    status_code: UNREACHABLE_STATUS,
                    latency_ms,
                }
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.probe_timeout.as_millis() as u64,
                    "Health probe timed out"
                );
                Reachability {
                    ok: false,
                    status_code: UNREACHABLE_STATUS,
                    latency_ms,
                }
            }
        }
    }

    async fn probe_platform(&self) -> bool {
        match timeout(self.config.probe_timeout, self.metrics.is_live()).await {
            Ok(Ok(live)) => live,
            Ok(Err(e)) => {
                warn!(error = %e, "Metrics backend liveness check failed");
                false
            }
            Err(_) => {
                warn!("Metrics backend liveness check timed out");
                false
            }
        }
    }

    async fn query_metric(&self, name: &'static str, query: &str) -> f64 {
        match timeout(self.config.probe_timeout, self.metrics.query_scalar(query)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                debug!(metric = name, error = %e, "Metric query failed, defaulting to 0");
                0.0
            }
            Err(_) => {
                debug!(metric = name, "Metric query timed out, defaulting to 0");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedHealth, ScriptedService, StaticMetrics};
    use std::time::Duration;

    fn prober(service: ScriptedService, metrics: StaticMetrics) -> (HealthProber, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let config = ProberConfig {
            probe_timeout: Duration::from_millis(50),
            ..ProberConfig::default()
        };
        let prober = HealthProber::new(Arc::new(service), Arc::new(metrics), bus.clone(), config);
        (prober, bus)
    }

    #[tokio::test]
    async fn test_healthy_snapshot_collects_metrics() {
        let queries = ProberConfig::default().queries;
        let metrics = StaticMetrics::new()
            .with_value(&queries.error_rate, 1.5)
            .with_value(&queries.memory_usage, 120.0)
            .with_value(&queries.request_count, 900.0);
        let (prober, bus) = prober(ScriptedService::healthy(), metrics);

        let before = Utc::now();
        let snapshot = prober.snapshot().await;

        assert!(snapshot.timestamp >= before && snapshot.timestamp <= Utc::now());
        assert!(snapshot.service_healthy);
        assert_eq!(snapshot.status_code, 200);
        assert!(snapshot.platform_healthy);
        assert!(snapshot.dependencies_healthy);
        assert_eq!(snapshot.metrics.error_rate_percent, 1.5);
        assert_eq!(snapshot.metrics.memory_usage_mb, 120.0);
        assert_eq!(snapshot.metrics.request_count, 900.0);
        assert_eq!(snapshot.metrics.p99_latency_ms, 0.0);
        assert_eq!(bus.history_by_type(EventType::HealthHealthy, 10).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sub_probes_degrade_to_defaults() {
        let (prober, bus) = prober(ScriptedService::unreachable(), StaticMetrics::failing());

        let snapshot = prober.snapshot().await;

        assert!(!snapshot.service_healthy);
        assert_eq!(snapshot.status_code, UNREACHABLE_STATUS);
        assert!(!snapshot.platform_healthy);
        assert!(!snapshot.dependencies_healthy);
        assert_eq!(snapshot.metrics, MetricsBundle::default());
        assert_eq!(bus.history_by_type(EventType::HealthDegraded, 10).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_still_reports_elapsed_latency() {
        let service = ScriptedService::new(ScriptedHealth::Hang(Duration::from_secs(30)));
        let (prober, _bus) = prober(service, StaticMetrics::new());

        let snapshot = prober.snapshot().await;

        assert_eq!(snapshot.status_code, UNREACHABLE_STATUS);
        assert!(snapshot.response_time_ms >= 50);
        assert!(snapshot.response_time_ms < 30_000);
        // Metrics still arrive even though the health probe hung
        assert!(snapshot.platform_healthy);
    }

    #[tokio::test]
    async fn test_503_marks_dependencies_unhealthy() {
        let service = ScriptedService::new(ScriptedHealth::Status(503));
        let (prober, _bus) = prober(service, StaticMetrics::new());

        let snapshot = prober.snapshot().await;
        assert_eq!(snapshot.status_code, 503);
        assert!(!snapshot.service_healthy);
        assert!(!snapshot.dependencies_healthy);
    }
}
