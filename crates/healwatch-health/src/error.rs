//! Error types for healwatch-health crate.
//!
//! Defines probe, metrics and remediation errors raised by collaborators.

use thiserror::Error;

/// Errors that can occur while talking to the monitored system.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Probe execution failed.
    #[error("probe failed: {0}")]
    ProbeFailed(String),

    /// Probe timed out waiting for response.
    #[error("probe timed out after {timeout_ms}ms")]
    ProbeTimeout { timeout_ms: u64 },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Monitoring backend answered with something that is not a scalar.
    #[error("invalid metrics payload: {0}")]
    InvalidMetricsPayload(String),

    /// Remediation action could not be delivered.
    #[error("remediation failed: {0}")]
    RemediationFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for health operations.
pub type HealthResult<T> = Result<T, HealthError>;
