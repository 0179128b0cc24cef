//! Error types for healwatch-agents crate.

use healwatch_health::HealthError;
use healwatch_types::IncidentId;
use thiserror::Error;

/// Errors raised inside a stage body.
///
/// They never escape the stage wrapper; they become failed stage results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A collaborator call failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] HealthError),

    /// The analyzer picked a strategy the healer cannot execute.
    #[error("unknown fix strategy: {0}")]
    UnknownStrategy(String),

    /// The incident disappeared from the store.
    #[error("incident not found: {0}")]
    MissingIncident(IncidentId),

    /// The stage body panicked.
    #[error("stage panicked: {0}")]
    Panicked(String),
}

/// Result type for stage bodies.
pub type AgentResult<T> = Result<T, AgentError>;
