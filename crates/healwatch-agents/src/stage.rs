//! Uniform stage wrapper.
//!
//! Every agent runs through [`run_stage`]: it publishes `agent:start`, writes
//! a timeline entry, runs the body, then publishes `agent:complete` or
//! `agent:error` and writes a closing entry. The wrapper always yields a
//! [`StageResult`]; errors and panics in the body become failed results.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use healwatch_types::{EventType, IncidentId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::context::AgentContext;
use crate::error::{AgentError, AgentResult};

/// The seven pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Observability,
    Analyzer,
    SelfHealing,
    RecoveryDecision,
    DisasterRecovery,
    TrafficSwitch,
    Reporter,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Observability => "observability",
            AgentKind::Analyzer => "analyzer",
            AgentKind::SelfHealing => "self_healing",
            AgentKind::RecoveryDecision => "recovery_decision",
            AgentKind::DisasterRecovery => "disaster_recovery",
            AgentKind::TrafficSwitch => "traffic_switch",
            AgentKind::Reporter => "reporter",
        }
    }

    /// Human-readable name used on the timeline.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Observability => "Observability Agent",
            AgentKind::Analyzer => "Analyzer Agent",
            AgentKind::SelfHealing => "Self-Healing Agent",
            AgentKind::RecoveryDecision => "Recovery Decision Agent",
            AgentKind::DisasterRecovery => "Disaster Recovery Agent",
            AgentKind::TrafficSwitch => "Traffic Switch Agent",
            AgentKind::Reporter => "Reporter Agent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed output of a stage body.
pub trait StageOutput: Serialize + Send {
    /// Why the stage did not achieve its goal, if it did not.
    fn failure(&self) -> Option<String> {
        None
    }
}

/// What a stage hands to the next decision point.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult<T> {
    pub agent: AgentKind,
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl<T> StageResult<T> {
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}

/// Run one stage body for `incident_id` under the uniform wrapper.
pub async fn run_stage<T, F>(
    ctx: &AgentContext,
    incident_id: &IncidentId,
    agent: AgentKind,
    body: F,
) -> StageResult<T>
where
    T: StageOutput,
    F: Future<Output = AgentResult<T>>,
{
    let start = Instant::now();
    ctx.bus.publish(
        EventType::AgentStart,
        json!({ "agent": agent, "incident_id": incident_id.to_string() }),
    );
    ctx.store
        .add_timeline(incident_id, format!("{} started", agent.display_name()), None);

    let outcome = match AssertUnwindSafe(body).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(AgentError::Panicked(panic_message(panic.as_ref()))),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let (data, error) = match outcome {
        Ok(output) => {
            let failure = output.failure();
            (Some(output), failure)
        }
        Err(e) => (None, Some(e.to_string())),
    };
    let data_json = data
        .as_ref()
        .and_then(|d| serde_json::to_value(d).ok())
        .unwrap_or(serde_json::Value::Null);

    match &error {
        None => {
            info!(agent = %agent, incident_id = %incident_id, duration_ms, "Stage completed");
            ctx.bus.publish(
                EventType::AgentComplete,
                json!({
                    "agent": agent,
                    "incident_id": incident_id.to_string(),
                    "duration_ms": duration_ms,
                    "data": data_json.clone(),
                }),
            );
            ctx.store.add_timeline(
                incident_id,
                format!("{} completed in {}ms", agent.display_name(), duration_ms),
                Some(data_json),
            );
        }
        Some(reason) => {
            warn!(agent = %agent, incident_id = %incident_id, error = %reason, "Stage failed");
            ctx.bus.publish(
                EventType::AgentError,
                json!({
                    "agent": agent,
                    "incident_id": incident_id.to_string(),
                    "duration_ms": duration_ms,
                    "error": reason,
                    "data": data_json.clone(),
                }),
            );
            ctx.store.add_timeline(
                incident_id,
                format!("{} failed: {}", agent.display_name(), reason),
                Some(data_json),
            );
        }
    }

    StageResult {
        agent,
        success: error.is_none(),
        data,
        error,
        duration_ms,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
