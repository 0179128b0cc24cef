//! Capability contracts of the external collaborators.
//!
//! The controller never talks to infrastructure directly; it goes through
//! these traits so tests can substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HealthResult;

/// Answer of the monitored service's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// Whether the status code indicates success.
    pub ok: bool,

    /// HTTP status code.
    pub status_code: u16,

    /// Raw response body.
    pub body: String,
}

impl ProbeResponse {
    pub fn from_status(status_code: u16) -> Self {
        Self {
            ok: (200..300).contains(&status_code),
            status_code,
            body: String::new(),
        }
    }
}

/// Acknowledgment of a remediation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAck {
    pub success: bool,
    pub message: String,
}

/// `GET` health status of the monitored service.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    async fn check_health(&self) -> HealthResult<ProbeResponse>;
}

/// Scalar queries against the monitoring backend.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Evaluate an instant query down to a single number.
    async fn query_scalar(&self, query: &str) -> HealthResult<f64>;

    /// Lightweight reachability check of the backend itself.
    async fn is_live(&self) -> HealthResult<bool>;
}

/// `POST` a reset/restart signal to the monitored service.
#[async_trait]
pub trait RemediationTarget: Send + Sync {
    async fn reset(&self) -> HealthResult<RemediationAck>;
}

/// Fault injection into the monitored service.
#[async_trait]
pub trait ChaosInjector: Send + Sync {
    async fn inject(
        &self,
        kind: &str,
        params: serde_json::Value,
    ) -> HealthResult<serde_json::Value>;
}
