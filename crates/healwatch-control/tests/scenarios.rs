//! End-to-end recovery scenarios driven through the orchestrator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use healwatch_agents::{AgentContext, AgentKind, PipelineTimings, RecoveryAgents, Verdict};
use healwatch_bus::EventBus;
use healwatch_control::{Orchestrator, OrchestratorConfig, PollOutcome};
use healwatch_health::fakes::{ScriptedHealth, ScriptedService, StaticMetrics};
use healwatch_health::{HealthProber, ProberConfig};
use healwatch_incident::IncidentStore;
use healwatch_types::{EventType, FailureType, IncidentStatus, RecoveryStatus, ResolutionPath};
use parking_lot::Mutex;

struct Harness {
    orchestrator: Arc<Orchestrator>,
    service: Arc<ScriptedService>,
    bus: Arc<EventBus>,
    store: Arc<IncidentStore>,
}

fn harness(service: ScriptedService, metrics: StaticMetrics, timings: PipelineTimings) -> Harness {
    let bus = Arc::new(EventBus::new());
    let store = Arc::new(IncidentStore::new(bus.clone()));
    let service = Arc::new(service);

    let prober = HealthProber::new(
        service.clone(),
        Arc::new(metrics),
        bus.clone(),
        ProberConfig::default(),
    );
    let agents = RecoveryAgents::new(Arc::new(AgentContext {
        bus: bus.clone(),
        store: store.clone(),
        probe: service.clone(),
        remediation: service.clone(),
        timings,
        service_name: "demo-app".to_string(),
    }));

    Harness {
        orchestrator: Orchestrator::new(prober, agents, OrchestratorConfig::default()),
        service,
        bus,
        store,
    }
}

fn recovered(outcome: PollOutcome) -> healwatch_control::PipelineSummary {
    match outcome {
        PollOutcome::Recovered(summary) => summary,
        other => panic!("expected a pipeline run, got {:?}", other),
    }
}

#[tokio::test]
async fn single_blip_never_opens_an_incident() {
    let service = ScriptedService::healthy().then([
        ScriptedHealth::Unreachable,
        ScriptedHealth::Healthy,
        ScriptedHealth::Status(503),
        ScriptedHealth::Healthy,
    ]);
    let h = harness(service, StaticMetrics::new(), PipelineTimings::immediate());

    for _ in 0..6 {
        h.orchestrator.poll_once().await.unwrap();
    }

    assert_eq!(h.store.count(), 0);
    assert_eq!(h.bus.history_by_type(EventType::AnomalyDetected, 10).len(), 2);
    assert_eq!(h.orchestrator.status().consecutive_healthy, 3);
}

#[tokio::test]
async fn two_consecutive_anomalies_open_exactly_one_incident() {
    let service = ScriptedService::healthy()
        .then([ScriptedHealth::Unreachable, ScriptedHealth::Unreachable])
        .recovering_on_reset();
    let h = harness(service, StaticMetrics::new(), PipelineTimings::immediate());

    let first = h.orchestrator.poll_once().await.unwrap();
    assert!(matches!(
        first,
        PollOutcome::Anomaly { failure_type: FailureType::ServiceDown, consecutive: 1 }
    ));

    let summary = recovered(h.orchestrator.poll_once().await.unwrap());
    assert_eq!(summary.final_status, IncidentStatus::Resolved);
    assert_eq!(h.store.count(), 1);
    assert_eq!(h.orchestrator.status().consecutive_unhealthy, 0);
    assert_eq!(h.bus.history_by_type(EventType::IncidentCreated, 10).len(), 1);
}

#[tokio::test]
async fn service_down_escalates_to_disaster_recovery_and_still_reports() {
    let h = harness(
        ScriptedService::unreachable().with_failing_reset(),
        StaticMetrics::new(),
        PipelineTimings::immediate(),
    );

    let lengths = Arc::new(Mutex::new(Vec::new()));
    let store = h.store.clone();
    let seen = lengths.clone();
    h.bus.subscribe(move |_event| {
        if let Some(incident) = store.list().last() {
            seen.lock()
                .push((incident.timeline.len(), incident.attempted_actions.len()));
        }
        Ok(())
    });

    h.orchestrator.poll_once().await.unwrap();
    let summary = recovered(h.orchestrator.poll_once().await.unwrap());

    assert_eq!(summary.verdict, Verdict::EscalateDr);
    assert_eq!(summary.resolution_path, ResolutionPath::DisasterRecovery);
    let agents: Vec<_> = summary.stages.iter().map(|s| s.agent).collect();
    assert_eq!(
        agents,
        vec![
            AgentKind::Observability,
            AgentKind::Analyzer,
            AgentKind::SelfHealing,
            AgentKind::RecoveryDecision,
            AgentKind::DisasterRecovery,
            AgentKind::TrafficSwitch,
            AgentKind::Reporter,
        ]
    );

    // Two polls plus five disaster-recovery checks; healing never got past its reset
    assert_eq!(h.service.health_check_count(), 7);
    assert_eq!(h.service.reset_count(), 2);

    let incident = h.store.get(&summary.incident_id).unwrap();
    assert_eq!(incident.failure_type, FailureType::ServiceDown);
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert!(incident.resolved_at.is_some());
    assert_eq!(incident.attempted_actions.len(), 2);
    assert!(incident.attempted_actions.iter().all(|a| !a.success));

    let report = incident.report.unwrap();
    assert_eq!(report.recovery_status, RecoveryStatus::Partial);
    assert_eq!(report.resolution_path, ResolutionPath::DisasterRecovery);
    assert_eq!(report.attempts.total, 2);
    assert_eq!(h.bus.history_by_type(EventType::ReportGenerated, 10).len(), 1);
    assert_eq!(h.bus.history_by_type(EventType::DrStarted, 10).len(), 1);

    let traffic = h.bus.history_by_type(EventType::TrafficComplete, 10);
    assert_eq!(traffic[0].data["state"], "rolled_back");

    let lengths = lengths.lock();
    assert!(!lengths.is_empty());
    assert!(lengths.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1));
}

#[tokio::test]
async fn disaster_recovery_success_switches_traffic_and_fully_recovers() {
    // Two polls and the healing check fail; disaster recovery and traffic checks pass
    let service = ScriptedService::unreachable().then([
        ScriptedHealth::Unreachable,
        ScriptedHealth::Unreachable,
        ScriptedHealth::Unreachable,
        ScriptedHealth::Healthy,
        ScriptedHealth::Healthy,
    ]);
    let h = harness(service, StaticMetrics::new(), PipelineTimings::immediate());

    h.orchestrator.poll_once().await.unwrap();
    let summary = recovered(h.orchestrator.poll_once().await.unwrap());

    assert_eq!(summary.verdict, Verdict::EscalateDr);
    assert_eq!(summary.final_status, IncidentStatus::Resolved);
    let failed: Vec<_> = summary
        .stages
        .iter()
        .filter(|s| !s.success)
        .map(|s| s.agent)
        .collect();
    assert_eq!(failed, vec![AgentKind::SelfHealing]);
    assert_eq!(h.service.health_check_count(), 5);
    assert_eq!(h.service.reset_count(), 2);

    let incident = h.store.get(&summary.incident_id).unwrap();
    let attempts: Vec<_> = incident
        .attempted_actions
        .iter()
        .map(|a| (a.action.as_str(), a.success))
        .collect();
    assert_eq!(
        attempts,
        vec![("restart_service", false), ("disaster_recovery", true)]
    );

    let dr = h.bus.history_by_type(EventType::DrComplete, 10);
    assert_eq!(dr[0].data["system_ready"], true);
    assert_eq!(dr[0].data["checks_performed"], 1);
    let traffic = h.bus.history_by_type(EventType::TrafficComplete, 10);
    assert_eq!(traffic[0].data["state"], "completed");

    let report = incident.report.unwrap();
    assert_eq!(report.resolution_path, ResolutionPath::DisasterRecovery);
    assert_eq!(report.recovery_status, RecoveryStatus::Full);
    assert_eq!(report.attempts.total, 2);
}

#[tokio::test]
async fn failed_final_verification_rolls_traffic_back() {
    // Disaster recovery sees one healthy check, then the service drops again
    let service = ScriptedService::unreachable().then([
        ScriptedHealth::Unreachable,
        ScriptedHealth::Unreachable,
        ScriptedHealth::Unreachable,
        ScriptedHealth::Healthy,
    ]);
    let h = harness(service, StaticMetrics::new(), PipelineTimings::immediate());

    h.orchestrator.poll_once().await.unwrap();
    let summary = recovered(h.orchestrator.poll_once().await.unwrap());

    let traffic = summary
        .stages
        .iter()
        .find(|s| s.agent == AgentKind::TrafficSwitch)
        .unwrap();
    assert!(!traffic.success);
    assert!(traffic
        .error
        .as_deref()
        .unwrap()
        .contains("final verification failed"));
    assert_eq!(h.service.health_check_count(), 5);

    let dr = h.bus.history_by_type(EventType::DrComplete, 10);
    assert_eq!(dr[0].data["system_ready"], true);
    let switching = h.bus.history_by_type(EventType::TrafficSwitching, 10);
    assert_eq!(switching[0].data["system_ready"], true);
    let complete = h.bus.history_by_type(EventType::TrafficComplete, 10);
    assert_eq!(complete[0].data["state"], "rolled_back");
    assert_eq!(complete[0].data["verified"], true);

    let incident = h.store.get(&summary.incident_id).unwrap();
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert_eq!(incident.report.unwrap().recovery_status, RecoveryStatus::Partial);
}

#[tokio::test]
async fn memory_leak_self_heals_without_disaster_recovery() {
    let queries = ProberConfig::default().queries;
    let h = harness(
        ScriptedService::healthy(),
        StaticMetrics::new().with_value(&queries.memory_usage, 250.0),
        PipelineTimings::immediate(),
    );

    let first = h.orchestrator.poll_once().await.unwrap();
    assert!(matches!(
        first,
        PollOutcome::Anomaly { failure_type: FailureType::MemoryLeak, .. }
    ));
    let summary = recovered(h.orchestrator.poll_once().await.unwrap());

    assert_eq!(summary.verdict, Verdict::Resolved);
    assert_eq!(summary.resolution_path, ResolutionPath::SelfHealed);
    assert!(!summary.ran(AgentKind::DisasterRecovery));
    assert!(!summary.ran(AgentKind::TrafficSwitch));
    assert!(summary.ran(AgentKind::Reporter));
    assert!(summary.stages.iter().all(|s| s.success));

    let incident = h.store.get(&summary.incident_id).unwrap();
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert_eq!(incident.attempted_actions.len(), 1);
    assert_eq!(incident.attempted_actions[0].action, "restart_service");

    let report = incident.report.unwrap();
    assert_eq!(report.recovery_status, RecoveryStatus::Full);
    assert_eq!(report.failure_type, FailureType::MemoryLeak);
    assert_eq!(h.bus.history_by_type(EventType::DrStarted, 10).len(), 0);
}

#[tokio::test]
async fn at_most_one_incident_is_ever_active() {
    let mut script = Vec::new();
    for i in 0..24 {
        script.push(match i % 5 {
            0 | 1 => ScriptedHealth::Unreachable,
            2 => ScriptedHealth::Healthy,
            _ => ScriptedHealth::Status(503),
        });
    }
    let h = harness(
        ScriptedService::healthy().then(script),
        StaticMetrics::new(),
        PipelineTimings::immediate(),
    );

    let max_active = Arc::new(AtomicUsize::new(0));
    let store = h.store.clone();
    let observed = max_active.clone();
    h.bus.subscribe(move |_event| {
        let active = store.list().iter().filter(|i| i.is_active()).count();
        observed.fetch_max(active, Ordering::SeqCst);
        Ok(())
    });

    for _ in 0..20 {
        h.orchestrator.poll_once().await.unwrap();
        assert!(h.store.list().iter().filter(|i| i.is_active()).count() <= 1);
    }

    assert!(h.store.count() >= 2);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert!(h.store.list().iter().all(|i| i.report.is_some()));
}

#[tokio::test(start_paused = true)]
async fn poll_during_pipeline_is_skipped() {
    let service = ScriptedService::unreachable().recovering_on_reset();
    let h = harness(service, StaticMetrics::new(), PipelineTimings::default());
    h.orchestrator.poll_once().await.unwrap();

    let (first, second) = tokio::join!(h.orchestrator.poll_once(), async {
        tokio::task::yield_now().await;
        h.orchestrator.poll_once().await
    });

    assert!(matches!(first.unwrap(), PollOutcome::Recovered(_)));
    assert!(matches!(second.unwrap(), PollOutcome::Skipped));
    assert_eq!(h.store.count(), 1);
    assert!(!h.orchestrator.status().pipeline_running);
}

#[tokio::test(start_paused = true)]
async fn poll_in_flight_when_a_pipeline_opens_is_skipped() {
    let service = ScriptedService::unreachable()
        .then([
            ScriptedHealth::Unreachable,
            ScriptedHealth::Hang(Duration::from_secs(1)),
            ScriptedHealth::Unreachable,
        ])
        .recovering_on_reset();
    let h = harness(service, StaticMetrics::new(), PipelineTimings::default());
    h.orchestrator.poll_once().await.unwrap();

    // The slow probe starts first; the fast one confirms the outage and opens a pipeline
    let (slow, fast) = tokio::join!(h.orchestrator.poll_once(), h.orchestrator.poll_once());

    assert!(matches!(slow.unwrap(), PollOutcome::Skipped));
    let summary = recovered(fast.unwrap());
    assert_eq!(summary.final_status, IncidentStatus::Resolved);
    assert_eq!(h.store.count(), 1);

    let status = h.orchestrator.status();
    assert_eq!(status.consecutive_unhealthy, 0);
    assert!(!status.pipeline_running);
    assert_eq!(h.bus.history_by_type(EventType::HealthCheck, 10).len(), 2);
}
