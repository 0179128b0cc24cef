//! Stage 4: recovery decision.

use std::sync::Arc;

use healwatch_types::{IncidentId, IncidentStatus};
use serde::{Deserialize, Serialize};

use crate::agents::healer::HealingOutcome;
use crate::context::AgentContext;
use crate::error::AgentResult;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

/// Where the pipeline goes after self-healing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Resolved,
    EscalateDr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub prior_attempts: usize,
    pub explanation: String,
}

impl StageOutput for Decision {}

pub struct RecoveryDecisionAgent {
    ctx: Arc<AgentContext>,
}

impl RecoveryDecisionAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        incident_id: &IncidentId,
        healing: &StageResult<HealingOutcome>,
    ) -> StageResult<Decision> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::RecoveryDecision,
            self.decide(incident_id, healing.success),
        )
        .await
    }

    // Any healing failure escalates; the attempt count only shapes the text.
    async fn decide(&self, incident_id: &IncidentId, healed: bool) -> AgentResult<Decision> {
        let prior_attempts = self
            .ctx
            .store
            .get(incident_id)
            .map(|incident| incident.attempted_actions.len())
            .unwrap_or(0);

        if healed {
            return Ok(Decision {
                verdict: Verdict::Resolved,
                prior_attempts,
                explanation: format!(
                    "Self-healing restored the service after {} attempt(s)",
                    prior_attempts
                ),
            });
        }

        self.ctx
            .store
            .transition(incident_id, IncidentStatus::Escalated);
        Ok(Decision {
            verdict: Verdict::EscalateDr,
            prior_attempts,
            explanation: format!(
                "Self-healing failed after {} attempt(s); escalating to disaster recovery",
                prior_attempts
            ),
        })
    }
}
