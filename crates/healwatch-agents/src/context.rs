//! Shared collaborators and timings of the recovery agents.

use std::sync::Arc;
use std::time::Duration;

use healwatch_bus::EventBus;
use healwatch_health::{RemediationTarget, ServiceProbe, DEFAULT_PROBE_TIMEOUT};
use healwatch_incident::IncidentStore;
use tokio::time::timeout;
use tracing::debug;

/// Number of health re-checks Disaster Recovery performs before giving up.
pub const DR_HEALTH_CHECKS: u32 = 5;

/// Fixed delays standing in for real remediation latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTimings {
    /// Simulated evidence collection time.
    pub observability_delay: Duration,

    /// Wait between the healing reset and its health check.
    pub healing_stabilization: Duration,

    /// Wait after the disaster-recovery reset.
    pub dr_initial_wait: Duration,

    /// Spacing of the disaster-recovery health re-checks.
    pub dr_check_interval: Duration,

    /// Wait before the final traffic verification.
    pub traffic_stabilization: Duration,

    /// Bound on every health check issued by a stage.
    pub health_check_timeout: Duration,
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self {
            observability_delay: Duration::from_millis(500),
            healing_stabilization: Duration::from_secs(3),
            dr_initial_wait: Duration::from_secs(5),
            dr_check_interval: Duration::from_secs(2),
            traffic_stabilization: Duration::from_secs(3),
            health_check_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl PipelineTimings {
    /// No artificial delays.
    pub fn immediate() -> Self {
        Self {
            observability_delay: Duration::ZERO,
            healing_stabilization: Duration::ZERO,
            dr_initial_wait: Duration::ZERO,
            dr_check_interval: Duration::ZERO,
            traffic_stabilization: Duration::ZERO,
            health_check_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Everything a stage may touch.
pub struct AgentContext {
    pub bus: Arc<EventBus>,
    pub store: Arc<IncidentStore>,
    pub probe: Arc<dyn ServiceProbe>,
    pub remediation: Arc<dyn RemediationTarget>,
    pub timings: PipelineTimings,
    /// Name of the monitored service, used as the attempt target.
    pub service_name: String,
}

impl AgentContext {
    /// One bounded health check; any failure reads as unhealthy.
    pub async fn service_healthy(&self) -> bool {
        match timeout(self.timings.health_check_timeout, self.probe.check_health()).await {
            Ok(Ok(response)) => response.ok,
            Ok(Err(e)) => {
                debug!(error = %e, "Health check failed");
                false
            }
            Err(_) => {
                debug!("Health check timed out");
                false
            }
        }
    }

    pub(crate) async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
