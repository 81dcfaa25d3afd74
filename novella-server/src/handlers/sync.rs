//! Server-Sent Events handler for import notifications

use crate::state::{AppState, ServerEvent};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

impl ServerEvent {
    /// SSE event name and JSON payload
    pub fn to_sse(&self) -> (&'static str, serde_json::Value) {
        match self {
            ServerEvent::NovelImported {
                id,
                title,
                chapters,
            } => (
                "novel_imported",
                serde_json::json!({ "id": id, "title": title, "chapters": chapters }),
            ),
            ServerEvent::LanguageAdded {
                id,
                language,
                created,
                updated,
            } => (
                "language_added",
                serde_json::json!({
                    "id": id,
                    "language": language,
                    "created": created,
                    "updated": updated,
                }),
            ),
            ServerEvent::Error { message } => {
                ("error", serde_json::json!({ "message": message }))
            }
        }
    }
}

/// SSE endpoint for real-time updates
pub async fn sync_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx);

    let event_stream = stream.filter_map(|result| match result {
        Ok(event) => {
            let (event_type, data) = event.to_sse();
            Some(Ok(Event::default().event(event_type).data(data.to_string())))
        }
        Err(_) => None, // Lagged, skip
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
