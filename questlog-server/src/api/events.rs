//! Level-up event stream
//!
//! Endpoints:
//! - GET /api/events?user_id=<uuid> (server-sent events, event name `level_up`)

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ApiState;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/api/events", get(level_up_events))
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub user_id: Uuid,
}

async fn level_up_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = query.user_id;
    debug!(%user_id, "event stream opened");

    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |msg| match msg {
        Ok(event) if event.user_id == user_id => Event::default()
            .event("level_up")
            .json_data(&event)
            .ok()
            .map(Ok),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(%user_id, skipped, "event stream lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
