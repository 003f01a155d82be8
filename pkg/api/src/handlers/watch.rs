use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use pkg_state::WatchEvent;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub seq: Option<u64>,
}

fn to_sse(event: &WatchEvent) -> Option<Result<Event, Infallible>> {
    let data = serde_json::to_string(event).ok()?;
    Some(Ok(Event::default()
        .id(event.seq.to_string())
        .event(format!("{:?}", event.event_type))
        .data(data)))
}

/// GET /api/v1/watch — SSE stream of store changes, optionally filtered by
/// key prefix and resumed after a sequence number.
pub async fn watch_events(
    State(state): State<AppState>,
    Query(query): Query<WatchQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let prefix = query.prefix.unwrap_or_default();
    let from_seq = query.seq.unwrap_or(0);

    info!(
        "Watch subscription: prefix='{}', from_seq={}",
        prefix, from_seq
    );

    let event_log = &state.registry.store().event_log;
    // Subscribe first; duplicates between replay and live are skipped by seq.
    let live = BroadcastStream::new(event_log.subscribe());
    let buffered = event_log.events_since(from_seq).await;
    let replayed_up_to = buffered.last().map_or(from_seq, |e| e.seq);

    let replay_prefix = prefix.clone();
    let buffered_stream = tokio_stream::iter(
        buffered
            .into_iter()
            .filter(move |e| e.matches(&replay_prefix))
            .filter_map(|e| to_sse(&e)),
    );

    let live_stream = live.filter_map(move |result| match result {
        Ok(event) if event.seq > replayed_up_to => {
            if event.matches(&prefix) {
                to_sse(&event)
            } else {
                None
            }
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!("Watch client lagged by {} event(s)", missed);
            None
        }
    });

    Sse::new(buffered_stream.chain(live_stream)).keep_alive(KeepAlive::default())
}
