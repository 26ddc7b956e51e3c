//! Event routes: history replay and a live server-sent event stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use finplat_core::workflow::{EventEnvelope, EventReplay};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::AppState;

/// Creates the event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/stream", get(stream_events))
}

/// Query parameters for event replay.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Return events with a greater sequence number. Defaults to 0 (everything retained).
    #[serde(default)]
    pub since: u64,
}

/// GET `/events?since=n` - Retained events after sequence `n`.
///
/// `truncated` is set when part of the requested range has already been
/// evicted from history; the client must then resynchronize from entity reads.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventReplay> {
    Json(state.engine.replay_events(query.since))
}

/// GET `/events/stream` - Live events as server-sent events.
///
/// Each message carries the event type as its name and the sequence number as
/// its id. A client that falls behind the channel gets a `lagged` message and
/// should replay the gap from `/events`.
async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(envelope_stream(state.engine.subscribe()))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn envelope_stream(
    receiver: broadcast::Receiver<EventEnvelope>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        let event = match receiver.recv().await {
            Ok(envelope) => to_sse(&envelope),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event stream subscriber lagged");
                Event::default()
                    .event("lagged")
                    .data(skipped.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(event), receiver))
    })
}

fn to_sse(envelope: &EventEnvelope) -> Event {
    let event = Event::default()
        .id(envelope.sequence.to_string())
        .event(envelope.event.name());
    match serde_json::to_string(envelope) {
        Ok(json) => event.data(json),
        Err(e) => {
            warn!(error = %e, sequence = envelope.sequence, "Failed to encode event");
            event.data("{}")
        }
    }
}
