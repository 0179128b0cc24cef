//! Stage 5: disaster recovery, entered only on escalation.
//!
//! Database health is inferred from the application's health checks; there
//! is no independent database probe.

use std::sync::Arc;

use chrono::Utc;
use healwatch_types::{EventType, IncidentId, IncidentStatus, RecoveryAttempt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::context::{AgentContext, DR_HEALTH_CHECKS};
use crate::error::AgentResult;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrOutcome {
    pub backup_id: String,
    pub reset_acknowledged: bool,
    pub checks_performed: u32,
    pub system_ready: bool,
}

impl StageOutput for DrOutcome {
    fn failure(&self) -> Option<String> {
        (!self.system_ready).then(|| {
            format!(
                "system not ready after {} health checks",
                self.checks_performed
            )
        })
    }
}

pub struct DisasterRecoveryAgent {
    ctx: Arc<AgentContext>,
}

impl DisasterRecoveryAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, incident_id: &IncidentId) -> StageResult<DrOutcome> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::DisasterRecovery,
            self.recover(incident_id),
        )
        .await
    }

    async fn recover(&self, incident_id: &IncidentId) -> AgentResult<DrOutcome> {
        let ctx = &self.ctx;
        ctx.store.transition(incident_id, IncidentStatus::Recovering);
        ctx.bus.publish(
            EventType::DrStarted,
            json!({ "incident_id": incident_id.to_string() }),
        );
        let started_at = Utc::now();

        let backup_id = format!("backup-{}", started_at.format("%Y%m%d-%H%M%S"));
        ctx.store.add_timeline(
            incident_id,
            format!("Identified latest backup {}", backup_id),
            None,
        );

        // The service may be fully down; a failed reset is expected here.
        let reset_acknowledged = match ctx.remediation.reset().await {
            Ok(ack) => ack.success,
            Err(e) => {
                warn!(error = %e, "Disaster recovery reset failed, continuing");
                false
            }
        };
        ctx.store.add_timeline(
            incident_id,
            format!(
                "Restore signal {}",
                if reset_acknowledged { "acknowledged" } else { "not acknowledged" }
            ),
            None,
        );

        ctx.pause(ctx.timings.dr_initial_wait).await;

        let mut checks_performed = 0;
        let mut system_ready = false;
        for check in 1..=DR_HEALTH_CHECKS {
            checks_performed = check;
            if ctx.service_healthy().await {
                system_ready = true;
                break;
            }
            debug!(check, "Service not ready yet");
            if check < DR_HEALTH_CHECKS {
                ctx.pause(ctx.timings.dr_check_interval).await;
            }
        }

        let attempt = if system_ready {
            RecoveryAttempt::success("disaster_recovery", &ctx.service_name, started_at)
        } else {
            RecoveryAttempt::failure(
                "disaster_recovery",
                &ctx.service_name,
                started_at,
                format!("service unhealthy after {} checks", checks_performed),
            )
        };
        ctx.store.record_attempt(incident_id, attempt);

        info!(
            incident_id = %incident_id,
            system_ready,
            checks_performed,
            "Disaster recovery finished"
        );
        ctx.bus.publish(
            EventType::DrComplete,
            json!({
                "incident_id": incident_id.to_string(),
                "backup_id": backup_id,
                "system_ready": system_ready,
                "database_healthy": system_ready,
                "checks_performed": checks_performed,
            }),
        );

        Ok(DrOutcome {
            backup_id,
            reset_acknowledged,
            checks_performed,
            system_ready,
        })
    }
}
