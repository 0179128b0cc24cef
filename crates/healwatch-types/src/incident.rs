//! Incident records and their terminal reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyReport, FailureType, Severity};
use crate::ids::{IncidentId, ReportId};

/// Lifecycle status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Detected,
    Analyzing,
    Healing,
    Escalated,
    Recovering,
    Resolved,
    Failed,
}

impl IncidentStatus {
    /// Terminal states absorb every further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            IncidentStatus::Detected => 0,
            IncidentStatus::Analyzing => 1,
            IncidentStatus::Healing => 2,
            IncidentStatus::Escalated => 3,
            IncidentStatus::Recovering => 4,
            IncidentStatus::Resolved | IncidentStatus::Failed => 5,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Non-terminal states only move forward; `resolved` and `failed` are
    /// reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Analyzing => "analyzing",
            IncidentStatus::Healing => "healing",
            IncidentStatus::Escalated => "escalated",
            IncidentStatus::Recovering => "recovering",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One remediation action taken against the monitored system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    /// Kind of action (e.g. `restart_service`, `disaster_recovery`).
    pub action: String,

    /// When the action started.
    pub timestamp: DateTime<Utc>,

    /// What the action was aimed at.
    pub target: String,

    /// Whether the action achieved its goal.
    pub success: bool,

    /// Error text if it did not.
    pub error: Option<String>,

    /// How long the action took in milliseconds.
    pub duration_ms: u64,
}

impl RecoveryAttempt {
    /// Create a successful attempt that started at `started_at`.
    pub fn success(
        action: impl Into<String>,
        target: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            timestamp: started_at,
            target: target.into(),
            success: true,
            error: None,
            duration_ms: elapsed_ms(started_at),
        }
    }

    /// Create a failed attempt that started at `started_at`.
    pub fn failure(
        action: impl Into<String>,
        target: impl Into<String>,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            timestamp: started_at,
            target: target.into(),
            success: false,
            error: Some(error.into()),
            duration_ms: elapsed_ms(started_at),
        }
    }
}

fn elapsed_ms(since: DateTime<Utc>) -> u64 {
    (Utc::now() - since).num_milliseconds().max(0) as u64
}

/// Narrative entry on an incident timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TimelineEvent {
    pub fn new(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            details,
        }
    }
}

/// A tracked anomaly and its full remediation lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub created_at: DateTime<Utc>,
    pub status: IncidentStatus,
    pub failure_type: FailureType,
    pub severity: Severity,
    pub affected_services: Vec<String>,
    pub description: String,
    pub root_cause: Option<String>,
    /// Append-only.
    pub attempted_actions: Vec<RecoveryAttempt>,
    /// Append-only, ordered by append time.
    pub timeline: Vec<TimelineEvent>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub report: Option<IncidentReport>,
}

impl Incident {
    /// Open a new incident for an anomaly.
    pub fn from_anomaly(anomaly: &AnomalyReport) -> Self {
        Self {
            id: IncidentId::generate(),
            created_at: Utc::now(),
            status: IncidentStatus::Detected,
            failure_type: anomaly.failure_type,
            severity: anomaly.severity,
            affected_services: anomaly.affected_services.clone(),
            description: anomaly.description.clone(),
            root_cause: None,
            attempted_actions: Vec::new(),
            timeline: Vec::new(),
            resolved_at: None,
            report: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// How the incident ended up being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    SelfHealed,
    DisasterRecovery,
}

/// Whether the remediation path fully restored the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Full,
    Partial,
}

/// Roll-up of all recovery attempts of an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub actions: Vec<String>,
}

impl AttemptSummary {
    pub fn from_attempts(attempts: &[RecoveryAttempt]) -> Self {
        let succeeded = attempts.iter().filter(|a| a.success).count();
        let actions = attempts
            .iter()
            .map(|a| {
                let outcome = if a.success { "ok" } else { "failed" };
                format!("{} on {} ({}, {}ms)", a.action, a.target, outcome, a.duration_ms)
            })
            .collect();

        Self {
            total: attempts.len(),
            succeeded,
            failed: attempts.len() - succeeded,
            actions,
        }
    }
}

/// Terminal artifact produced once per incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub id: ReportId,
    pub incident_id: IncidentId,
    pub failure_type: FailureType,
    pub timeline: Vec<TimelineEvent>,
    pub root_cause: String,
    pub attempts: AttemptSummary,
    pub recommendations: Vec<String>,
    pub resolution_path: ResolutionPath,
    pub recovery_status: RecoveryStatus,
    pub time_to_resolve_ms: u64,
    pub generated_at: DateTime<Utc>,
}
