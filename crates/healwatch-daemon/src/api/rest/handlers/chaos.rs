//! Chaos injection pass-through

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use healwatch_types::EventType;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Forward a fault to the monitored service and publish `chaos:injected`.
///
/// The request body, if any, must be a JSON object of fault parameters.
pub async fn inject_chaos(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let params = parse_params(&body)?;

    let response = state.chaos.inject(&kind, params.clone()).await.map_err(|e| {
        warn!(kind = %kind, error = %e, "Chaos injection failed");
        ApiError::from(e)
    })?;

    info!(kind = %kind, "Chaos injected");
    state.bus.publish(
        EventType::ChaosInjected,
        json!({ "kind": kind, "params": params, "response": response.clone() }),
    );

    Ok(Json(response))
}

fn parse_params(body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ApiError::BadRequest("chaos parameters must be a JSON object".to_string())),
        Err(e) => Err(ApiError::BadRequest(format!("invalid chaos parameters: {}", e))),
    }
}
