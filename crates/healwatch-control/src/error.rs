//! Error types for the orchestrator.

use healwatch_types::IncidentId;
use thiserror::Error;

/// Orchestrator error type
#[derive(Debug, Error)]
pub enum ControlError {
    /// Another pipeline holds the single-flight guard
    #[error("a recovery pipeline is already running")]
    PipelineBusy,

    /// An incident is still open
    #[error("incident {0} is still active")]
    IncidentActive(IncidentId),
}

/// Result type for orchestrator operations
pub type ControlResult<T> = Result<T, ControlError>;
