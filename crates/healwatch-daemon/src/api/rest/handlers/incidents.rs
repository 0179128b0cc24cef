//! Incident query handlers

use axum::{
    extract::{Path, State},
    Json,
};
use healwatch_types::{Incident, IncidentId};

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// All incidents in creation order
pub async fn list_incidents(State(state): State<AppState>) -> Json<Vec<Incident>> {
    Json(state.store.list())
}

/// One incident with its timeline, attempts and report
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Incident>> {
    let incident_id: IncidentId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid incident ID: {}", id)))?;

    state
        .store
        .get(&incident_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("incident {}", incident_id)))
}
