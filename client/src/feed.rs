//! Creation feed reader: SSE framing, event decoding and the reconnect loop.

use std::time::Duration;

use claimloop_shared::{FeedEvent, TerritoryRecord};
use tracing::{debug, info, warn};

use crate::config::{FEED_RETRY_BASE_MS, FEED_RETRY_MAX_MS};
use crate::remote::fetch_territories;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Incremental SSE parser. Chunks may split lines, frames or UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every frame they complete.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer
            .extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_frame_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&raw[..end]);
            if let Some(frame) = parse_frame(&text) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

/// Frames made only of comments (keep-alives) yield nothing.
fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => frame.event = Some(value.to_string()),
            "id" => frame.id = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

/// Decode `created` and `resync` frames; anything else is ignored.
pub fn decode_event(frame: &SseFrame) -> Option<FeedEvent> {
    match frame.event.as_deref() {
        Some("created" | "resync") => match serde_json::from_str::<FeedEvent>(&frame.data) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, id = ?frame.id, "dropping undecodable feed event");
                None
            }
        },
        other => {
            debug!(event = ?other, "ignoring feed frame");
            None
        }
    }
}

pub fn retry_backoff(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    let factor = 1u64 << exponent;
    Duration::from_millis((FEED_RETRY_BASE_MS * factor).min(FEED_RETRY_MAX_MS))
}

/// Tracks feed sequence numbers to report gaps and server restarts.
#[derive(Debug, Default)]
struct SeqTracker {
    last: Option<u64>,
}

impl SeqTracker {
    fn observe(&mut self, event: &FeedEvent) {
        let seq = event.seq();
        if seq == 0 {
            return;
        }
        if let Some(last) = self.last {
            if seq < last {
                info!(last_seq = last, seq, "feed sequence reset; store host restarted");
            } else if matches!(event, FeedEvent::Created { .. }) && seq > last + 1 {
                warn!(last_seq = last, seq, "feed sequence gap");
            }
        }
        self.last = Some(seq);
    }
}

/// Follow the creation feed forever, reconnecting with exponential backoff.
///
/// After a reconnect the full territory list is replayed through `on_create`, since
/// creations made while disconnected are never re-sent. Folding is idempotent, so the
/// replay only adds what was missed.
pub async fn run<F>(http: reqwest::Client, events_url: String, list_url: String, on_create: F)
where
    F: Fn(TerritoryRecord) + Send + Sync + 'static,
{
    let mut consecutive_failures = 0u32;
    let mut connected_before = false;
    let mut seq = SeqTracker::default();

    loop {
        match http
            .get(&events_url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(mut response) => {
                info!(url = %events_url, "creation feed connected");
                consecutive_failures = 0;
                if connected_before {
                    replay_missed(&http, &list_url, &on_create).await;
                }
                connected_before = true;

                let mut parser = SseParser::new();
                loop {
                    match response.chunk().await {
                        Ok(Some(chunk)) => {
                            for frame in parser.push(&chunk) {
                                if let Some(event) = decode_event(&frame) {
                                    seq.observe(&event);
                                    for record in event.into_records() {
                                        on_create(record);
                                    }
                                }
                            }
                        }
                        Ok(None) => {
                            info!("creation feed closed by server");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "creation feed interrupted");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, url = %events_url, "creation feed connect failed");
            }
        }

        consecutive_failures = consecutive_failures.saturating_add(1);
        let backoff = retry_backoff(consecutive_failures);
        debug!(
            attempt = consecutive_failures,
            backoff_ms = backoff.as_millis() as u64,
            "retrying creation feed"
        );
        tokio::time::sleep(backoff).await;
    }
}

async fn replay_missed<F>(http: &reqwest::Client, list_url: &str, on_create: &F)
where
    F: Fn(TerritoryRecord),
{
    match fetch_territories(http, list_url).await {
        Ok(records) => {
            info!(territories = records.len(), "replaying territories after reconnect");
            for record in records {
                on_create(record);
            }
        }
        Err(e) => warn!(error = %e, "could not replay territories after reconnect"),
    }
}
