//! Stream normalization
//!
//! Turns any adapter's delta sequence into the gateway's SSE protocol: one
//! `message` frame per non-empty delta (with code-fence repair applied),
//! then exactly one terminal frame — `done` on normal completion, `error` on
//! failure. The terminal frame is always the last frame on a stream.

pub mod fence;

use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::adapters::Delta;
use crate::error::AppError;
use crate::session::SessionAccumulator;

pub use fence::{FenceRepair, FenceState};

/// Reconnect hint carried on every SSE frame, in milliseconds
pub const STREAM_RETRY_MS: u64 = 15_000;

/// Payload content of the terminal `done` frame
pub const DONE_MARKER: &str = "[DONE]";

/// SSE event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseEventKind {
    Message,
    Done,
    Error,
}

impl SseEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SseEventKind::Message => "message",
            SseEventKind::Done => "done",
            SseEventKind::Error => "error",
        }
    }
}

/// One Server-Sent-Events frame
///
/// `data` is always a JSON document: `{"content": ...}` for message and done
/// frames, `{"error": ...}` for error frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: SseEventKind,
    pub id: String,
    pub retry_ms: u64,
    pub data: String,
}

impl SseFrame {
    fn new(event: SseEventKind, data: String) -> Self {
        Self {
            event,
            id: Uuid::new_v4().to_string(),
            retry_ms: STREAM_RETRY_MS,
            data,
        }
    }

    /// Content frame
    pub fn message(content: &str) -> Self {
        Self::new(
            SseEventKind::Message,
            json!({ "content": content }).to_string(),
        )
    }

    /// Terminal frame for normal completion
    pub fn done() -> Self {
        Self::new(
            SseEventKind::Done,
            json!({ "content": DONE_MARKER }).to_string(),
        )
    }

    /// Terminal frame for failure
    pub fn error(err: &AppError) -> Self {
        Self::new(
            SseEventKind::Error,
            json!({ "error": format!("Streaming error: {err}") }).to_string(),
        )
    }

    /// Convert into the axum SSE event representation
    pub fn into_event(self) -> axum::response::sse::Event {
        axum::response::sse::Event::default()
            .event(self.event.as_str())
            .id(self.id)
            .retry(std::time::Duration::from_millis(self.retry_ms))
            .data(self.data)
    }
}

/// Normalize a delta stream into SSE frames
///
/// The accumulator, when present, observes every repaired fragment and is
/// finalized after the `done` frame has been yielded — persistence can never
/// delay frame delivery. On failure it is discarded; partial turns are not
/// persisted. The normalizer pulls one delta at a time and never reads
/// ahead of what it has delivered.
pub fn normalize<S>(
    deltas: S,
    mut accumulator: Option<SessionAccumulator>,
) -> impl Stream<Item = SseFrame> + Send
where
    S: Stream<Item = Result<Delta, AppError>> + Send + 'static,
{
    stream! {
        let mut repair = FenceRepair::new();
        pin_mut!(deltas);

        loop {
            match deltas.next().await {
                Some(Ok(delta)) => {
                    if !delta.content.is_empty() {
                        let repaired = repair.apply(&delta.content);
                        if let Some(acc) = accumulator.as_mut() {
                            acc.push(&repaired);
                        }
                        yield SseFrame::message(&repaired);
                    }
                    if let Some(reason) = delta.stop_reason {
                        debug!(stop_reason = %reason, "Stream closed by backend");
                        yield SseFrame::done();
                        if let Some(acc) = accumulator.take() {
                            acc.finalize().await;
                        }
                        return;
                    }
                }
                Some(Err(err)) => {
                    yield SseFrame::error(&err);
                    if let Some(acc) = accumulator.take() {
                        acc.discard();
                    }
                    return;
                }
                None => {
                    yield SseFrame::done();
                    if let Some(acc) = accumulator.take() {
                        acc.finalize().await;
                    }
                    return;
                }
            }
        }
    }
}
