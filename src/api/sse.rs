//! Server-Sent Events support

use super::types::SessionView;
use crate::session::SessionState;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Stream every published snapshot, starting with the current one.
///
/// Intermediate snapshots may be skipped when the client falls behind; the
/// latest one is always delivered.
pub fn snapshot_stream(
    snapshot_rx: watch::Receiver<SessionState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let snapshots = WatchStream::new(snapshot_rx).map(|state| Ok(snapshot_event(state)));

    Sse::new(snapshots).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(state: SessionState) -> Event {
    let data = serde_json::to_string(&SessionView::from(state)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize snapshot");
        "{}".to_string()
    });
    Event::default().event("snapshot").data(data)
}
