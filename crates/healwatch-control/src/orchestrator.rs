//! Polling orchestrator.
//!
//! Ties the prober, the classifier, the incident store and the recovery
//! agents together. Anomalies are debounced: an incident is opened only after
//! `unhealthy_threshold` consecutive anomalous polls and only when no other
//! incident is active. At most one pipeline runs at a time. A poll that finds
//! a pipeline running, or sees one open while its probe is in flight, is
//! skipped rather than queued and its reading is discarded.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use healwatch_agents::playbook::diagnose;
use healwatch_agents::{AgentKind, RecoveryAgents, StageResult, Verdict};
use healwatch_bus::EventBus;
use healwatch_health::{classify, HealthProber};
use healwatch_incident::IncidentStore;
use healwatch_types::{
    AnomalyReport, EventType, FailureType, HealthSnapshot, Incident, IncidentId, IncidentStatus,
    ResolutionPath,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::error::{ControlError, ControlResult};

#[derive(Debug, Default)]
struct PollState {
    consecutive_healthy: u32,
    consecutive_unhealthy: u32,
    last_snapshot: Option<HealthSnapshot>,
    last_poll_at: Option<DateTime<Utc>>,
    /// Bumped whenever a pipeline opens an incident.
    pipeline_epoch: u64,
}

/// Single-flight guard; the flag is cleared on drop, including during unwinding.
struct PipelineGuard<'a>(&'a AtomicBool);

impl<'a> PipelineGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PipelineGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Outcome of one stage inside a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub agent: AgentKind,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl<T> From<&StageResult<T>> for StageRecord {
    fn from(result: &StageResult<T>) -> Self {
        Self {
            agent: result.agent,
            success: result.success,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
        }
    }
}

/// What a full pipeline run did.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub incident_id: IncidentId,
    pub verdict: Verdict,
    pub resolution_path: ResolutionPath,
    pub stages: Vec<StageRecord>,
    pub final_status: IncidentStatus,
}

impl PipelineSummary {
    pub fn ran(&self, agent: AgentKind) -> bool {
        self.stages.iter().any(|s| s.agent == agent)
    }
}

/// What a single poll did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// A pipeline was running or opened mid-probe; nothing was counted.
    Skipped,
    Healthy,
    /// Anomaly seen but not (yet) acted upon.
    Anomaly {
        failure_type: FailureType,
        consecutive: u32,
    },
    /// The anomaly was confirmed and a pipeline ran to completion.
    Recovered(PipelineSummary),
}

/// Read-only view of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub pipeline_running: bool,
    pub consecutive_healthy: u32,
    pub consecutive_unhealthy: u32,
    pub poll_interval_ms: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_snapshot: Option<HealthSnapshot>,
    pub active_incident: Option<Incident>,
    pub total_incidents: usize,
}

/// The polling loop and pipeline driver.
pub struct Orchestrator {
    prober: HealthProber,
    agents: RecoveryAgents,
    store: Arc<IncidentStore>,
    bus: Arc<EventBus>,
    config: OrchestratorConfig,
    running: AtomicBool,
    pipeline_running: AtomicBool,
    state: Mutex<PollState>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl Orchestrator {
    /// Build an orchestrator; the bus and store are taken from the agents' context.
    pub fn new(
        prober: HealthProber,
        agents: RecoveryAgents,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let store = agents.context().store.clone();
        let bus = agents.context().bus.clone();

        Arc::new(Self {
            prober,
            agents,
            store,
            bus,
            config,
            running: AtomicBool::new(false),
            pipeline_running: AtomicBool::new(false),
            state: Mutex::new(PollState::default()),
            stop_tx: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<IncidentStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start periodic polling; the first poll happens immediately.
    ///
    /// Returns `false` if the loop was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        *self.stop_tx.lock() = Some(stop_tx);

        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(this.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => this.tick().await,
                    _ = stop_rx.changed() => break,
                }
                if *stop_rx.borrow() {
                    break;
                }
            }
            debug!("Poll loop exited");
        });

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Orchestrator started"
        );
        self.publish_status();
        true
    }

    /// Stop periodic polling. An in-flight pipeline runs to completion.
    ///
    /// Returns `false` if the loop was not running.
    pub fn stop(&self) -> bool {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(true);
        }

        info!("Orchestrator stopped");
        self.publish_status();
        true
    }

    async fn tick(&self) {
        match AssertUnwindSafe(self.poll_once()).catch_unwind().await {
            Ok(Ok(outcome)) => debug!(?outcome, "Poll finished"),
            Ok(Err(e)) => error!(error = %e, "Poll failed"),
            Err(_) => error!("Poll panicked"),
        }
    }

    /// Run one poll: snapshot, classify, debounce and maybe recover.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> ControlResult<PollOutcome> {
        if self.pipeline_running.load(Ordering::Acquire) {
            debug!("Pipeline running, skipping poll");
            return Ok(PollOutcome::Skipped);
        }

        let epoch = self.state.lock().pipeline_epoch;
        let snapshot = self.prober.snapshot().await;

        let service = &self.prober.config().service_name;
        let anomaly = classify(service, &snapshot);

        let consecutive_unhealthy = {
            let mut state = self.state.lock();
            // The reading predates remediation if a pipeline opened meanwhile.
            if self.pipeline_running.load(Ordering::Acquire) || state.pipeline_epoch != epoch {
                debug!("Pipeline opened during probe, discarding snapshot");
                return Ok(PollOutcome::Skipped);
            }
            state.last_snapshot = Some(snapshot.clone());
            state.last_poll_at = Some(Utc::now());
            if anomaly.is_some() {
                state.consecutive_unhealthy += 1;
                state.consecutive_healthy = 0;
            } else {
                state.consecutive_healthy += 1;
                state.consecutive_unhealthy = 0;
            }
            state.consecutive_unhealthy
        };
        self.bus.publish(
            EventType::HealthCheck,
            serde_json::to_value(&snapshot).unwrap_or_default(),
        );

        let Some(anomaly) = anomaly else {
            return Ok(PollOutcome::Healthy);
        };

        info!(
            failure_type = %anomaly.failure_type,
            severity = %anomaly.severity,
            consecutive = consecutive_unhealthy,
            "Anomaly detected"
        );
        self.bus.publish(
            EventType::AnomalyDetected,
            json!({
                "anomaly": anomaly,
                "consecutive": consecutive_unhealthy,
                "threshold": self.config.unhealthy_threshold,
            }),
        );

        if consecutive_unhealthy < self.config.unhealthy_threshold {
            return Ok(PollOutcome::Anomaly {
                failure_type: anomaly.failure_type,
                consecutive: consecutive_unhealthy,
            });
        }

        if let Some(active) = self.store.active() {
            debug!(incident_id = %active.id, "Incident already active, not opening another");
            return Ok(PollOutcome::Anomaly {
                failure_type: anomaly.failure_type,
                consecutive: consecutive_unhealthy,
            });
        }

        match self.run_pipeline(&anomaly, &snapshot).await {
            Ok(summary) => Ok(PollOutcome::Recovered(summary)),
            Err(ControlError::PipelineBusy) => Ok(PollOutcome::Skipped),
            Err(e) => Err(e),
        }
    }

    /// Open an incident for `anomaly` and drive it through the agents.
    #[instrument(skip(self, anomaly, snapshot), fields(failure_type = %anomaly.failure_type))]
    pub async fn run_pipeline(
        &self,
        anomaly: &AnomalyReport,
        snapshot: &HealthSnapshot,
    ) -> ControlResult<PipelineSummary> {
        let _guard =
            PipelineGuard::acquire(&self.pipeline_running).ok_or(ControlError::PipelineBusy)?;
        if let Some(active) = self.store.active() {
            return Err(ControlError::IncidentActive(active.id));
        }
        self.state.lock().pipeline_epoch += 1;

        let incident = self.store.create(anomaly);
        let id = &incident.id;
        let agents = &self.agents;
        let mut stages = Vec::with_capacity(7);

        let finding = agents.observability.run(id, anomaly, snapshot).await;
        stages.push(StageRecord::from(&finding));

        let analysis = agents.analyzer.run(id, incident.failure_type).await;
        stages.push(StageRecord::from(&analysis));
        let strategy = analysis
            .data()
            .map(|a| a.strategy.clone())
            .unwrap_or_else(|| diagnose(FailureType::Unknown).strategy);

        let healing = agents.self_healing.run(id, &strategy).await;
        stages.push(StageRecord::from(&healing));

        let decision = agents.decision.run(id, &healing).await;
        stages.push(StageRecord::from(&decision));
        let verdict = decision
            .data()
            .map(|d| d.verdict)
            .unwrap_or(Verdict::EscalateDr);

        let (resolution_path, report) = match verdict {
            Verdict::Resolved => (
                ResolutionPath::SelfHealed,
                agents
                    .reporter
                    .run(id, ResolutionPath::SelfHealed, healing.success)
                    .await,
            ),
            Verdict::EscalateDr => {
                let recovery = agents.disaster_recovery.run(id).await;
                stages.push(StageRecord::from(&recovery));
                let system_ready = recovery.data().map(|d| d.system_ready).unwrap_or(false);

                let traffic = agents.traffic_switch.run(id, system_ready).await;
                stages.push(StageRecord::from(&traffic));

                (
                    ResolutionPath::DisasterRecovery,
                    agents
                        .reporter
                        .run(id, ResolutionPath::DisasterRecovery, traffic.success)
                        .await,
                )
            }
        };
        stages.push(StageRecord::from(&report));

        let final_status = self.settle(id);
        self.state.lock().consecutive_unhealthy = 0;
        info!(incident_id = %id, status = %final_status, ?resolution_path, "Pipeline finished");

        Ok(PipelineSummary {
            incident_id: id.clone(),
            verdict,
            resolution_path,
            stages,
            final_status,
        })
    }

    /// Fail an incident the agents left active, so it cannot block the next one.
    fn settle(&self, id: &IncidentId) -> IncidentStatus {
        if self.store.get(id).map(|i| i.is_active()).unwrap_or(false) {
            warn!(incident_id = %id, "Pipeline ended without resolution");
            self.store.fail(id, "pipeline ended without resolution");
        }
        self.store
            .get(id)
            .map(|i| i.status)
            .unwrap_or(IncidentStatus::Failed)
    }

    /// Snapshot of the orchestrator state; never blocks on a pipeline.
    pub fn status(&self) -> OrchestratorStatus {
        let (consecutive_healthy, consecutive_unhealthy, last_snapshot, last_poll_at) = {
            let state = self.state.lock();
            (
                state.consecutive_healthy,
                state.consecutive_unhealthy,
                state.last_snapshot.clone(),
                state.last_poll_at,
            )
        };

        OrchestratorStatus {
            running: self.running.load(Ordering::Acquire),
            pipeline_running: self.pipeline_running.load(Ordering::Acquire),
            consecutive_healthy,
            consecutive_unhealthy,
            poll_interval_ms: self.config.poll_interval.as_millis() as u64,
            last_poll_at,
            last_snapshot,
            active_incident: self.store.active(),
            total_incidents: self.store.count(),
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.bus.publish(
            EventType::SystemStatus,
            json!({
                "running": status.running,
                "pipeline_running": status.pipeline_running,
                "total_incidents": status.total_incidents,
            }),
        );
    }
}
