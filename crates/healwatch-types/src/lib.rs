//! # healwatch types
//!
//! Shared data model for the healwatch self-healing controller:
//!
//! - [`HealthSnapshot`]: point-in-time view of the monitored service
//! - [`AnomalyReport`]: classifier verdict derived from a snapshot
//! - [`Incident`]: a tracked anomaly and its remediation lifecycle
//! - [`BusEvent`]: envelope for everything published on the event bus
//!
//! All types are plain serde structs; behaviour lives in the other crates.

pub mod anomaly;
pub mod events;
pub mod health;
pub mod ids;
pub mod incident;

pub use anomaly::{AnomalyReport, FailureType, Severity};
pub use events::{BusEvent, EventType};
pub use health::{HealthSnapshot, MetricsBundle};
pub use ids::{IncidentId, ReportId};
pub use incident::{
    AttemptSummary, Incident, IncidentReport, IncidentStatus, RecoveryAttempt, RecoveryStatus,
    ResolutionPath, TimelineEvent,
};
