//! Stage 1: package the anomaly evidence and the current snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use healwatch_types::{AnomalyReport, FailureType, HealthSnapshot, IncidentId, Severity};
use serde::{Deserialize, Serialize};

use crate::context::AgentContext;
use crate::error::AgentResult;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

/// Structured finding handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub failure_type: FailureType,
    pub severity: Severity,
    pub affected_services: Vec<String>,
    pub description: String,
    pub evidence: BTreeMap<String, serde_json::Value>,
    pub snapshot: HealthSnapshot,
    pub observed_at: DateTime<Utc>,
}

impl StageOutput for Finding {}

pub struct ObservabilityAgent {
    ctx: Arc<AgentContext>,
}

impl ObservabilityAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        incident_id: &IncidentId,
        anomaly: &AnomalyReport,
        snapshot: &HealthSnapshot,
    ) -> StageResult<Finding> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::Observability,
            self.observe(anomaly, snapshot),
        )
        .await
    }

    async fn observe(
        &self,
        anomaly: &AnomalyReport,
        snapshot: &HealthSnapshot,
    ) -> AgentResult<Finding> {
        self.ctx.pause(self.ctx.timings.observability_delay).await;

        Ok(Finding {
            failure_type: anomaly.failure_type,
            severity: anomaly.severity,
            affected_services: anomaly.affected_services.clone(),
            description: anomaly.description.clone(),
            evidence: anomaly.evidence.clone(),
            snapshot: snapshot.clone(),
            observed_at: Utc::now(),
        })
    }
}
