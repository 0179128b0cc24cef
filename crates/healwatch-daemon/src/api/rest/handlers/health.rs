//! Health and status handlers

use axum::{extract::State, Json};
use healwatch_control::OrchestratorStatus;
use serde::Serialize;

use crate::api::rest::state::AppState;

/// Daemon liveness response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Daemon liveness
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Orchestrator status plus daemon metadata
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub events_retained: usize,
    #[serde(flatten)]
    pub orchestrator: OrchestratorStatus,
}

/// Current snapshot, orchestrator state and active incident
pub async fn daemon_status(State(state): State<AppState>) -> Json<DaemonStatusResponse> {
    Json(DaemonStatusResponse {
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        events_retained: state.bus.len(),
        orchestrator: state.orchestrator.status(),
    })
}
