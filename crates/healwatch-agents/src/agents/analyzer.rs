//! Stage 2: deterministic root-cause analysis.

use std::sync::Arc;

use healwatch_types::{FailureType, IncidentId, IncidentStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AgentContext;
use crate::error::AgentResult;
use crate::playbook::{diagnose, Confidence, FixStrategy};
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

/// Diagnosis chosen for the incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub root_cause: String,
    pub category: String,
    pub strategy: FixStrategy,
    pub confidence: Confidence,
}

impl StageOutput for Analysis {}

pub struct AnalyzerAgent {
    ctx: Arc<AgentContext>,
}

impl AnalyzerAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        incident_id: &IncidentId,
        failure_type: FailureType,
    ) -> StageResult<Analysis> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::Analyzer,
            self.analyze(incident_id, failure_type),
        )
        .await
    }

    async fn analyze(
        &self,
        incident_id: &IncidentId,
        failure_type: FailureType,
    ) -> AgentResult<Analysis> {
        self.ctx
            .store
            .transition(incident_id, IncidentStatus::Analyzing);

        let diagnosis = diagnose(failure_type);
        info!(
            incident_id = %incident_id,
            category = diagnosis.category,
            strategy = %diagnosis.strategy,
            "Root cause identified"
        );
        self.ctx
            .store
            .set_root_cause(incident_id, diagnosis.root_cause);

        Ok(Analysis {
            root_cause: diagnosis.root_cause.to_string(),
            category: diagnosis.category.to_string(),
            strategy: diagnosis.strategy,
            confidence: diagnosis.confidence,
        })
    }
}
