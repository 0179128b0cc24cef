//! Error types for healwatch-incident crate.

use healwatch_types::{IncidentId, IncidentStatus};
use thiserror::Error;

/// Errors raised by checked incident mutations.
#[derive(Debug, Error)]
pub enum IncidentError {
    /// No incident with this id exists.
    #[error("incident not found: {0}")]
    NotFound(IncidentId),

    /// The state machine does not allow this move.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: IncidentId,
        from: IncidentStatus,
        to: IncidentStatus,
    },

    /// A report is already attached.
    #[error("incident {0} already has a report")]
    AlreadyReported(IncidentId),
}

/// Result type for incident operations.
pub type IncidentResult<T> = Result<T, IncidentError>;
