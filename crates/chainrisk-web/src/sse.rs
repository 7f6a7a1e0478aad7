//! Server-Sent Events feed of gateway activity.
//!
//! Each frame is named after the event type (`risk_recorded`,
//! `training_complete`, ...) and numbered per connection. Events a slow
//! client missed still consume ids, so a gap in `id` shows the loss.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::state::{AppEvent, SharedState};

/// `GET /api/events`
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut seq: u64 = 0;
    let stream = BroadcastStream::new(state.subscribe()).filter_map(move |result| match result {
        Ok(event) => {
            seq += 1;
            frame(&event, seq).map(Ok)
        }
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            seq += missed;
            warn!(missed, "event feed client lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn frame(event: &AppEvent, id: u64) -> Option<Event> {
    let data = serde_json::to_string(event).ok()?;
    Some(Event::default().event(event.kind()).id(id.to_string()).data(data))
}
