//! Orchestrator control handlers

use axum::{extract::State, Json};
use healwatch_control::{OrchestratorStatus, PollOutcome};
use serde::Serialize;
use tracing::info;

use crate::api::rest::state::AppState;
use crate::error::ApiResult;

/// Result of a start/stop request
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    /// Whether the request changed the running state
    pub changed: bool,
    pub status: OrchestratorStatus,
}

/// Start the polling loop
pub async fn start_orchestrator(State(state): State<AppState>) -> Json<LifecycleResponse> {
    let changed = state.orchestrator.start();
    info!(changed, "Orchestrator start requested via API");
    Json(LifecycleResponse {
        changed,
        status: state.orchestrator.status(),
    })
}

/// Stop the polling loop; an in-flight pipeline runs to completion
pub async fn stop_orchestrator(State(state): State<AppState>) -> Json<LifecycleResponse> {
    let changed = state.orchestrator.stop();
    info!(changed, "Orchestrator stop requested via API");
    Json(LifecycleResponse {
        changed,
        status: state.orchestrator.status(),
    })
}

/// Run one poll now
pub async fn poll_orchestrator(State(state): State<AppState>) -> ApiResult<Json<PollOutcome>> {
    Ok(Json(state.orchestrator.poll_once().await?))
}
