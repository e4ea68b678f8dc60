use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::AppState;

/// Creation feed. Emits `created` for every insert and `resync` with all territories when
/// the subscriber falls behind the broadcast buffer. Updates and deletes are never sent.
pub async fn territory_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    state.observability.record_feed_subscriber();
    debug!(seq = state.store.current_seq(), "creation feed subscriber connected");

    // Subscribe before the response is sent so no insert after the handshake is missed.
    let rx = state.store.events();
    let stream = async_stream::stream! {
        let mut stream = BroadcastStream::new(rx);

        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let Some(payload) = event_payload(event.json.as_ref()) else {
                        warn!(seq = event.seq, "created payload is not valid utf-8; dropping SSE event");
                        continue;
                    };
                    yield Ok(
                        Event::default()
                            .id(event.seq.to_string())
                            .event("created")
                            .data(payload),
                    );
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying all territories"
                    );
                    state.observability.record_lagged_feed_events(skipped);
                    let resync = state.store.resync_event();
                    let seq = resync.seq();
                    match serde_json::to_string(&resync) {
                        Ok(payload) => {
                            yield Ok(
                                Event::default()
                                    .id(seq.to_string())
                                    .event("resync")
                                    .data(payload),
                            );
                        }
                        Err(e) => warn!(error = %e, "failed to serialize resync event"),
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes.as_ref()).ok()
}
