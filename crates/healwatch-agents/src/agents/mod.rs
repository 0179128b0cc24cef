//! The seven recovery agents.

mod analyzer;
mod decision;
mod disaster_recovery;
mod healer;
mod observability;
mod reporter;
mod traffic;

use std::sync::Arc;

pub use analyzer::{Analysis, AnalyzerAgent};
pub use decision::{Decision, RecoveryDecisionAgent, Verdict};
pub use disaster_recovery::{DisasterRecoveryAgent, DrOutcome};
pub use healer::{HealingOutcome, SelfHealingAgent};
pub use observability::{Finding, ObservabilityAgent};
pub use reporter::ReporterAgent;
pub use traffic::{TrafficOutcome, TrafficState, TrafficSwitchAgent};

use crate::context::AgentContext;

/// All seven agents sharing one context.
pub struct RecoveryAgents {
    pub observability: ObservabilityAgent,
    pub analyzer: AnalyzerAgent,
    pub self_healing: SelfHealingAgent,
    pub decision: RecoveryDecisionAgent,
    pub disaster_recovery: DisasterRecoveryAgent,
    pub traffic_switch: TrafficSwitchAgent,
    pub reporter: ReporterAgent,
    ctx: Arc<AgentContext>,
}

impl RecoveryAgents {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            observability: ObservabilityAgent::new(ctx.clone()),
            analyzer: AnalyzerAgent::new(ctx.clone()),
            self_healing: SelfHealingAgent::new(ctx.clone()),
            decision: RecoveryDecisionAgent::new(ctx.clone()),
            disaster_recovery: DisasterRecoveryAgent::new(ctx.clone()),
            traffic_switch: TrafficSwitchAgent::new(ctx.clone()),
            reporter: ReporterAgent::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PipelineTimings, DR_HEALTH_CHECKS};
    use crate::playbook::{Confidence, FixStrategy};
    use crate::stage::{run_stage, AgentKind};
    use crate::AgentError;
    use healwatch_bus::EventBus;
    use healwatch_health::fakes::{ScriptedHealth, ScriptedService};
    use healwatch_incident::IncidentStore;
    use healwatch_types::{
        AnomalyReport, EventType, FailureType, HealthSnapshot, IncidentId, IncidentStatus,
        RecoveryStatus, ResolutionPath, Severity,
    };

    struct Harness {
        agents: RecoveryAgents,
        service: Arc<ScriptedService>,
        bus: Arc<EventBus>,
        store: Arc<IncidentStore>,
        incident_id: IncidentId,
    }

    fn harness(service: ScriptedService, failure_type: FailureType) -> Harness {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(IncidentStore::new(bus.clone()));
        let service = Arc::new(service);
        let ctx = Arc::new(AgentContext {
            bus: bus.clone(),
            store: store.clone(),
            probe: service.clone(),
            remediation: service.clone(),
            timings: PipelineTimings::immediate(),
            service_name: "demo-app".to_string(),
        });
        let anomaly = AnomalyReport::new(failure_type, Severity::High, "test anomaly")
            .with_service("demo-app");
        let incident_id = store.create(&anomaly).id;

        Harness {
            agents: RecoveryAgents::new(ctx),
            service,
            bus,
            store,
            incident_id,
        }
    }

    fn analysis(strategy: FixStrategy) -> Analysis {
        Analysis {
            root_cause: "test".to_string(),
            category: "test".to_string(),
            strategy,
            confidence: Confidence::High,
        }
    }

    #[tokio::test]
    async fn test_wrapper_emits_start_and_complete() {
        let h = harness(ScriptedService::healthy(), FailureType::MemoryLeak);
        let anomaly = AnomalyReport::new(FailureType::MemoryLeak, Severity::Medium, "memory")
            .with_evidence("memory_usage_mb", 250.0);

        let result = h
            .agents
            .observability
            .run(&h.incident_id, &anomaly, &HealthSnapshot::healthy())
            .await;

        assert!(result.success);
        assert_eq!(result.agent, AgentKind::Observability);
        assert_eq!(result.data().unwrap().evidence["memory_usage_mb"], 250.0);
        assert_eq!(h.bus.history_by_type(EventType::AgentStart, 10).len(), 1);
        assert_eq!(h.bus.history_by_type(EventType::AgentComplete, 10).len(), 1);

        let timeline = h.store.get(&h.incident_id).unwrap().timeline;
        assert!(timeline.iter().any(|e| e.message == "Observability Agent started"));
    }

    #[tokio::test]
    async fn test_wrapper_converts_panics_into_failed_results() {
        let h = harness(ScriptedService::healthy(), FailureType::Unknown);
        let ctx = h.agents.context().clone();

        let result = run_stage(&ctx, &h.incident_id, AgentKind::Analyzer, async {
            if h.incident_id.to_string().is_empty() {
                return Ok(analysis(FixStrategy::RestartService));
            }
            panic!("analyzer blew up");
        })
        .await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("analyzer blew up"));
        assert_eq!(h.bus.history_by_type(EventType::AgentError, 10).len(), 1);
    }

    #[tokio::test]
    async fn test_analyzer_transitions_and_records_root_cause() {
        let h = harness(ScriptedService::healthy(), FailureType::DatabaseFailure);

        let result = h
            .agents
            .analyzer
            .run(&h.incident_id, FailureType::DatabaseFailure)
            .await;

        let analysis = result.data.unwrap();
        assert_eq!(analysis.strategy, FixStrategy::FailoverDatabase);
        let incident = h.store.get(&h.incident_id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Analyzing);
        assert_eq!(incident.root_cause.as_deref(), Some(analysis.root_cause.as_str()));
    }

    #[tokio::test]
    async fn test_self_healing_succeeds_when_reset_restores_health() {
        let service = ScriptedService::unreachable().recovering_on_reset();
        let h = harness(service, FailureType::ServiceDown);

        let result = h
            .agents
            .self_healing
            .run(&h.incident_id, &FixStrategy::RestartService)
            .await;

        assert!(result.success);
        assert_eq!(h.service.reset_count(), 1);
        let incident = h.store.get(&h.incident_id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Healing);
        assert_eq!(incident.attempted_actions.len(), 1);
        assert!(incident.attempted_actions[0].success);
    }

    #[tokio::test]
    async fn test_self_healing_failed_reset_records_one_attempt() {
        let service = ScriptedService::unreachable().with_failing_reset();
        let h = harness(service, FailureType::ServiceDown);

        let result = h
            .agents
            .self_healing
            .run(&h.incident_id, &FixStrategy::RestartService)
            .await;

        assert!(!result.success);
        assert!(!result.data.unwrap().reset_acknowledged);
        assert_eq!(h.service.health_check_count(), 0);
        let attempts = h.store.get(&h.incident_id).unwrap().attempted_actions;
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].success);
    }

    #[tokio::test]
    async fn test_self_healing_unknown_strategy_fails_immediately() {
        let h = harness(ScriptedService::healthy(), FailureType::Unknown);

        let result = h
            .agents
            .self_healing
            .run(
                &h.incident_id,
                &FixStrategy::Other("reboot_datacenter".to_string()),
            )
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.unwrap(),
            AgentError::UnknownStrategy("reboot_datacenter".to_string()).to_string()
        );
        assert_eq!(h.service.reset_count(), 0);
        assert_eq!(h.store.get(&h.incident_id).unwrap().attempted_actions.len(), 1);
    }

    #[tokio::test]
    async fn test_decision_escalates_on_any_failure() {
        let service = ScriptedService::unreachable().with_failing_reset();
        let h = harness(service, FailureType::ServiceDown);
        let healing = h
            .agents
            .self_healing
            .run(&h.incident_id, &FixStrategy::RestartService)
            .await;

        let decision = h.agents.decision.run(&h.incident_id, &healing).await;

        let decision = decision.data.unwrap();
        assert_eq!(decision.verdict, Verdict::EscalateDr);
        assert_eq!(decision.prior_attempts, 1);
        assert_eq!(
            h.store.get(&h.incident_id).unwrap().status,
            IncidentStatus::Escalated
        );
    }

    #[tokio::test]
    async fn test_disaster_recovery_gives_up_after_five_checks() {
        let h = harness(ScriptedService::unreachable(), FailureType::ServiceDown);

        let result = h.agents.disaster_recovery.run(&h.incident_id).await;

        assert!(!result.success);
        let outcome = result.data.unwrap();
        assert!(!outcome.system_ready);
        assert_eq!(outcome.checks_performed, DR_HEALTH_CHECKS);
        assert_eq!(h.service.health_check_count(), DR_HEALTH_CHECKS as usize);
        assert_eq!(h.bus.history_by_type(EventType::DrStarted, 10).len(), 1);
        assert_eq!(h.bus.history_by_type(EventType::DrComplete, 10).len(), 1);
        assert_eq!(h.store.get(&h.incident_id).unwrap().attempted_actions.len(), 1);
    }

    #[tokio::test]
    async fn test_disaster_recovery_stops_at_first_healthy_check() {
        let service = ScriptedService::healthy()
            .with_failing_reset()
            .then([ScriptedHealth::Unreachable, ScriptedHealth::Status(503)]);
        let h = harness(service, FailureType::ServiceDown);

        let outcome = h.agents.disaster_recovery.run(&h.incident_id).await.data.unwrap();

        assert!(outcome.system_ready);
        assert!(!outcome.reset_acknowledged);
        assert_eq!(outcome.checks_performed, 3);
    }

    #[tokio::test]
    async fn test_traffic_switch_short_circuits_when_not_ready() {
        let h = harness(ScriptedService::healthy(), FailureType::ServiceDown);

        let result = h.agents.traffic_switch.run(&h.incident_id, false).await;

        assert!(!result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.state, TrafficState::RolledBack);
        assert!(!outcome.verified);
        assert_eq!(h.service.health_check_count(), 0);
    }

    #[tokio::test]
    async fn test_traffic_switch_completes_on_healthy_verification() {
        let h = harness(ScriptedService::healthy(), FailureType::ServiceDown);

        let outcome = h.agents.traffic_switch.run(&h.incident_id, true).await.data.unwrap();
        assert_eq!(outcome.state, TrafficState::Completed);
        assert_eq!(h.bus.history_by_type(EventType::TrafficComplete, 10).len(), 1);
    }

    #[tokio::test]
    async fn test_traffic_switch_rolls_back_when_final_check_fails() {
        let h = harness(ScriptedService::unreachable(), FailureType::ServiceDown);

        let result = h.agents.traffic_switch.run(&h.incident_id, true).await;

        assert!(!result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.state, TrafficState::RolledBack);
        assert!(outcome.verified);
        assert_eq!(h.service.health_check_count(), 1);

        let complete = h.bus.history_by_type(EventType::TrafficComplete, 10);
        assert_eq!(complete[0].data["state"], "rolled_back");
        assert_eq!(complete[0].data["verified"], true);
    }

    #[tokio::test]
    async fn test_reporter_attaches_report_and_resolves() {
        let h = harness(ScriptedService::healthy(), FailureType::MemoryLeak);
        h.store.transition(&h.incident_id, IncidentStatus::Recovering);

        let result = h
            .agents
            .reporter
            .run(&h.incident_id, ResolutionPath::DisasterRecovery, false)
            .await;

        let report = result.data.unwrap();
        assert_eq!(report.recovery_status, RecoveryStatus::Partial);
        assert_eq!(report.resolution_path, ResolutionPath::DisasterRecovery);
        assert_eq!(report.recommendations.len(), 5);

        let incident = h.store.get(&h.incident_id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert_eq!(incident.report.unwrap().id, report.id);
        assert_eq!(h.bus.history_by_type(EventType::ReportGenerated, 10).len(), 1);
    }

    #[tokio::test]
    async fn test_reporter_fails_for_missing_incident() {
        let h = harness(ScriptedService::healthy(), FailureType::MemoryLeak);
        let unknown = IncidentId::generate();

        let result = h
            .agents
            .reporter
            .run(&unknown, ResolutionPath::SelfHealed, true)
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("incident not found"));
    }
}
