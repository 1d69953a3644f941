//! Server-Sent Events (SSE) streaming parser.
//!
//! Streaming chat endpoints deliver token-by-token responses as SSE.
//! [`sse_events`] turns any buffered byte reader into a lazy stream of
//! events: nothing is read from the underlying connection until the
//! consumer asks for the next event.

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

use crate::AiError;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type (e.g., "result", "error").
    pub event: Option<String>,
    /// The event data, multi-line payloads joined with `\n`.
    pub data: String,
    pub id: Option<String>,
    /// The last comment line seen for this event, without the leading `:`.
    pub comment: Option<String>,
}

/// Wrap an HTTP response body as a buffered reader.
pub fn body_reader(response: reqwest::Response) -> impl AsyncBufRead + Unpin + Send + 'static {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    tokio::io::BufReader::new(StreamReader::new(byte_stream))
}

/// Parse SSE events from `reader` on demand.
pub fn sse_events<R>(reader: R) -> impl Stream<Item = Result<SseEvent, AiError>> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let state = ParserState {
        lines: reader.lines(),
        pending: SseEvent::default(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            match state.lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = state.push_line(&line) {
                        return Some((Ok(event), state));
                    }
                }
                Ok(None) => {
                    // Flush any event not terminated by a blank line
                    state.finished = true;
                    let last = state.take_pending();
                    return last.map(|event| (Ok(event), state));
                }
                Err(e) => {
                    state.finished = true;
                    return Some((Err(AiError::NetworkError(e.to_string())), state));
                }
            }
        }
    })
}

struct ParserState<R> {
    lines: Lines<R>,
    pending: SseEvent,
    finished: bool,
}

impl<R> ParserState<R> {
    fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            // Empty line = end of event
            return self.take_pending();
        }

        if let Some(comment) = line.strip_prefix(':') {
            self.pending.comment = Some(comment.trim().to_string());
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.pending.event = Some(value.to_string()),
            "data" => {
                if !self.pending.data.is_empty() {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
            }
            "id" => self.pending.id = Some(value.to_string()),
            // retry: and unknown fields
            _ => {}
        }
        None
    }

    fn take_pending(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.pending);
        (!event.data.is_empty()).then_some(event)
    }
}
