//! Event types published on the healwatch bus
//!
//! The set of event types is closed; payloads are free-form JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed enumeration of bus event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // ═══════════════════════════════════════════════════════════════════
    // HEALTH
    // ═══════════════════════════════════════════════════════════════════
    #[serde(rename = "health:check")]
    HealthCheck,
    #[serde(rename = "health:healthy")]
    HealthHealthy,
    #[serde(rename = "health:degraded")]
    HealthDegraded,
    #[serde(rename = "anomaly:detected")]
    AnomalyDetected,

    // ═══════════════════════════════════════════════════════════════════
    // AGENTS
    // ═══════════════════════════════════════════════════════════════════
    #[serde(rename = "agent:start")]
    AgentStart,
    #[serde(rename = "agent:complete")]
    AgentComplete,
    #[serde(rename = "agent:error")]
    AgentError,

    // ═══════════════════════════════════════════════════════════════════
    // INCIDENTS
    // ═══════════════════════════════════════════════════════════════════
    #[serde(rename = "incident:created")]
    IncidentCreated,
    #[serde(rename = "incident:update")]
    IncidentUpdate,
    #[serde(rename = "incident:resolved")]
    IncidentResolved,

    // ═══════════════════════════════════════════════════════════════════
    // RECOVERY
    // ═══════════════════════════════════════════════════════════════════
    #[serde(rename = "recovery:action")]
    RecoveryAction,
    #[serde(rename = "recovery:success")]
    RecoverySuccess,
    #[serde(rename = "recovery:failed")]
    RecoveryFailed,
    #[serde(rename = "dr:started")]
    DrStarted,
    #[serde(rename = "dr:complete")]
    DrComplete,
    #[serde(rename = "traffic:switching")]
    TrafficSwitching,
    #[serde(rename = "traffic:complete")]
    TrafficComplete,
    #[serde(rename = "report:generated")]
    ReportGenerated,

    // ═══════════════════════════════════════════════════════════════════
    // SYSTEM
    // ═══════════════════════════════════════════════════════════════════
    #[serde(rename = "system:status")]
    SystemStatus,
    #[serde(rename = "chaos:injected")]
    ChaosInjected,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 20] = [
        EventType::HealthCheck,
        EventType::HealthHealthy,
        EventType::HealthDegraded,
        EventType::AnomalyDetected,
        EventType::AgentStart,
        EventType::AgentComplete,
        EventType::AgentError,
        EventType::IncidentCreated,
        EventType::IncidentUpdate,
        EventType::IncidentResolved,
        EventType::RecoveryAction,
        EventType::RecoverySuccess,
        EventType::RecoveryFailed,
        EventType::DrStarted,
        EventType::DrComplete,
        EventType::TrafficSwitching,
        EventType::TrafficComplete,
        EventType::ReportGenerated,
        EventType::SystemStatus,
        EventType::ChaosInjected,
    ];

    /// Wire tag of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::HealthCheck => "health:check",
            EventType::HealthHealthy => "health:healthy",
            EventType::HealthDegraded => "health:degraded",
            EventType::AnomalyDetected => "anomaly:detected",
            EventType::AgentStart => "agent:start",
            EventType::AgentComplete => "agent:complete",
            EventType::AgentError => "agent:error",
            EventType::IncidentCreated => "incident:created",
            EventType::IncidentUpdate => "incident:update",
            EventType::IncidentResolved => "incident:resolved",
            EventType::RecoveryAction => "recovery:action",
            EventType::RecoverySuccess => "recovery:success",
            EventType::RecoveryFailed => "recovery:failed",
            EventType::DrStarted => "dr:started",
            EventType::DrComplete => "dr:complete",
            EventType::TrafficSwitching => "traffic:switching",
            EventType::TrafficComplete => "traffic:complete",
            EventType::ReportGenerated => "report:generated",
            EventType::SystemStatus => "system:status",
            EventType::ChaosInjected => "chaos:injected",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Envelope for every bus publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Event type tag
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Free-form payload
    pub data: serde_json::Value,
}

impl BusEvent {
    pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            timestamp: chrono::Utc::now(),
            data,
        }
    }
}
