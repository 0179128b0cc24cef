//! Error types for healwatch-bus.

use thiserror::Error;

/// Errors raised by bus subscribers.
#[derive(Debug, Error)]
pub enum BusError {
    /// A subscriber failed to handle an event.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl BusError {
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler(reason.into())
    }
}

/// Result type for subscriber callbacks.
pub type BusResult<T> = Result<T, BusError>;
