//! Stage 7: incident report, always the last stage.

use std::sync::Arc;

use chrono::Utc;
use healwatch_types::{
    AttemptSummary, EventType, IncidentId, IncidentReport, RecoveryStatus, ReportId,
    ResolutionPath,
};
use serde_json::json;
use tracing::info;

use crate::context::AgentContext;
use crate::error::{AgentError, AgentResult};
use crate::playbook::recommendations;
use crate::stage::{run_stage, AgentKind, StageOutput, StageResult};

impl StageOutput for IncidentReport {}

pub struct ReporterAgent {
    ctx: Arc<AgentContext>,
}

impl ReporterAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }

    /// `recovered` tells whether the path's final remediation step succeeded.
    pub async fn run(
        &self,
        incident_id: &IncidentId,
        path: ResolutionPath,
        recovered: bool,
    ) -> StageResult<IncidentReport> {
        run_stage(
            &self.ctx,
            incident_id,
            AgentKind::Reporter,
            self.report(incident_id, path, recovered),
        )
        .await
    }

    async fn report(
        &self,
        incident_id: &IncidentId,
        path: ResolutionPath,
        recovered: bool,
    ) -> AgentResult<IncidentReport> {
        let incident = self
            .ctx
            .store
            .get(incident_id)
            .ok_or_else(|| AgentError::MissingIncident(incident_id.clone()))?;

        let end = incident.resolved_at.unwrap_or_else(Utc::now);
        let time_to_resolve_ms = (end - incident.created_at).num_milliseconds().max(0) as u64;
        let recovery_status = if recovered {
            RecoveryStatus::Full
        } else {
            RecoveryStatus::Partial
        };

        let report = IncidentReport {
            id: ReportId::generate(),
            incident_id: incident.id.clone(),
            failure_type: incident.failure_type,
            timeline: incident.timeline.clone(),
            root_cause: incident
                .root_cause
                .clone()
                .unwrap_or_else(|| "Undetermined".to_string()),
            attempts: AttemptSummary::from_attempts(&incident.attempted_actions),
            recommendations: recommendations(incident.failure_type),
            resolution_path: path,
            recovery_status,
            time_to_resolve_ms,
            generated_at: Utc::now(),
        };

        self.ctx.store.attach_report(incident_id, report.clone());
        self.ctx.store.resolve(incident_id);

        info!(
            incident_id = %incident_id,
            report_id = %report.id,
            time_to_resolve_ms,
            "Incident report generated"
        );
        self.ctx.bus.publish(
            EventType::ReportGenerated,
            json!({
                "incident_id": incident_id.to_string(),
                "report_id": report.id.to_string(),
                "resolution_path": path,
                "recovery_status": recovery_status,
                "time_to_resolve_ms": time_to_resolve_ms,
            }),
        );
        Ok(report)
    }
}
