//! Stage 3: self-healing.
//!
//! Every known strategy maps to the same concrete remediation: reset the
//! service, let it stabilize, then check its health. Exactly one recovery
//! attempt is recorded per run.

use std::sync::Arc;

use chrono::Utc;
use healwatch_types::{IncidentId, IncidentStatus, RecoveryAttempt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::AgentContext;
use crate::error::{AgentError, AgentResult};
use crate::playbook::FixStrategy;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

/// Result of one remediation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingOutcome {
    pub strategy: FixStrategy,
    pub reset_acknowledged: bool,
    pub healthy_after: bool,
    pub message: String,
}

impl HealingOutcome {
    pub fn healed(&self) -> bool {
        self.reset_acknowledged && self.healthy_after
    }
}

impl StageOutput for HealingOutcome {
    fn failure(&self) -> Option<String> {
        (!self.healed()).then(|| self.message.clone())
    }
}

pub struct SelfHealingAgent {
    ctx: Arc<AgentContext>,
}

impl SelfHealingAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        incident_id: &IncidentId,
        strategy: &FixStrategy,
    ) -> StageResult<HealingOutcome> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::SelfHealing,
            self.heal(incident_id, strategy),
        )
        .await
    }

    async fn heal(
        &self,
        incident_id: &IncidentId,
        strategy: &FixStrategy,
    ) -> AgentResult<HealingOutcome> {
        self.ctx.store.transition(incident_id, IncidentStatus::Healing);
        let started_at = Utc::now();

        let outcome = self.remediate(strategy).await;

        let attempt = match &outcome {
            Ok(o) if o.healed() => {
                RecoveryAttempt::success(strategy.as_str(), &self.ctx.service_name, started_at)
            }
            Ok(o) => RecoveryAttempt::failure(
                strategy.as_str(),
                &self.ctx.service_name,
                started_at,
                o.message.clone(),
            ),
            Err(e) => RecoveryAttempt::failure(
                strategy.as_str(),
                &self.ctx.service_name,
                started_at,
                e.to_string(),
            ),
        };
        self.ctx.store.record_attempt(incident_id, attempt);

        outcome
    }

    async fn remediate(&self, strategy: &FixStrategy) -> AgentResult<HealingOutcome> {
        if let FixStrategy::Other(token) = strategy {
            return Err(AgentError::UnknownStrategy(token.clone()));
        }

        let ack = match self.ctx.remediation.reset().await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(error = %e, strategy = %strategy, "Reset request failed");
                return Ok(HealingOutcome {
                    strategy: strategy.clone(),
                    reset_acknowledged: false,
                    healthy_after: false,
                    message: format!("reset failed: {}", e),
                });
            }
        };

        if !ack.success {
            return Ok(HealingOutcome {
                strategy: strategy.clone(),
                reset_acknowledged: false,
                healthy_after: false,
                message: format!("reset rejected: {}", ack.message),
            });
        }

        self.ctx.pause(self.ctx.timings.healing_stabilization).await;
        let healthy_after = self.ctx.service_healthy().await;
        info!(strategy = %strategy, healthy_after, "Remediation applied");

        Ok(HealingOutcome {
            strategy: strategy.clone(),
            reset_acknowledged: true,
            healthy_after,
            message: if healthy_after {
                format!("{} restored service health", strategy)
            } else {
                format!("service still unhealthy after {}", strategy)
            },
        })
    }
}
