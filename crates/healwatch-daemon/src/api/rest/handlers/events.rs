//! Event history and streaming handlers

use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use healwatch_types::{BusEvent, EventType};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Get events query params
#[derive(Debug, Deserialize)]
pub struct GetEventsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

fn default_limit() -> usize {
    50
}

/// Most recent events, oldest first
pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<GetEventsQuery>,
) -> ApiResult<Json<Vec<BusEvent>>> {
    let events = match query.event_type {
        Some(tag) => {
            let event_type: EventType = tag
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("Unknown event type: {}", tag)))?;
            state.bus.history_by_type(event_type, query.limit)
        }
        None => state.bus.history(query.limit),
    };

    Ok(Json(events))
}

/// Stream events via SSE: retained history first, then live publications
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before reading history so nothing published in between is lost
    let rx = state.bus.stream();
    let history = state.bus.history(state.bus.capacity());
    let replayed: HashSet<Uuid> = history.iter().map(|e| e.id).collect();

    let replay = stream::iter(history.into_iter().map(|event| Ok(to_sse(&event))));

    let live = stream::unfold((rx, replayed), |(mut rx, replayed)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if replayed.contains(&event.id) => continue,
                Ok(event) => return Some((Ok(to_sse(&event)), (rx, replayed))),
                Err(RecvError::Lagged(skipped)) => {
                    let comment = Event::default().comment(format!("lagged {}", skipped));
                    return Some((Ok(comment), (rx, replayed)));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(replay.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_sse(event: &BusEvent) -> Event {
    Event::default()
        .event(event.event_type.as_str())
        .data(serde_json::to_string(event).unwrap_or_default())
}
