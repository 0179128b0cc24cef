//! Stage 6: traffic switch, entered only on escalation.

use std::sync::Arc;

use healwatch_types::{EventType, IncidentId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::AgentContext;
use crate::error::AgentResult;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficState {
    Completed,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficOutcome {
    pub state: TrafficState,
    /// Whether the final health verification ran.
    pub verified: bool,
    pub reason: String,
}

impl StageOutput for TrafficOutcome {
    fn failure(&self) -> Option<String> {
        (self.state == TrafficState::RolledBack).then(|| self.reason.clone())
    }
}

pub struct TrafficSwitchAgent {
    ctx: Arc<AgentContext>,
}

impl TrafficSwitchAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        incident_id: &IncidentId,
        system_ready: bool,
    ) -> StageResult<TrafficOutcome> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::TrafficSwitch,
            self.switch(incident_id, system_ready),
        )
        .await
    }

    async fn switch(
        &self,
        incident_id: &IncidentId,
        system_ready: bool,
    ) -> AgentResult<TrafficOutcome> {
        self.ctx.bus.publish(
            EventType::TrafficSwitching,
            json!({ "incident_id": incident_id.to_string(), "system_ready": system_ready }),
        );

        let outcome = if !system_ready {
            TrafficOutcome {
                state: TrafficState::RolledBack,
                verified: false,
                reason: "recovered system not ready; traffic left on primary".to_string(),
            }
        } else {
            self.ctx.pause(self.ctx.timings.traffic_stabilization).await;
            if self.ctx.service_healthy().await {
                TrafficOutcome {
                    state: TrafficState::Completed,
                    verified: true,
                    reason: "traffic switched to recovered system".to_string(),
                }
            } else {
                TrafficOutcome {
                    state: TrafficState::RolledBack,
                    verified: true,
                    reason: "final verification failed; traffic rolled back".to_string(),
                }
            }
        };

        self.ctx.bus.publish(
            EventType::TrafficComplete,
            json!({
                "incident_id": incident_id.to_string(),
                "state": outcome.state,
                "verified": outcome.verified,
                "reason": outcome.reason,
            }),
        );
        Ok(outcome)
    }
}
