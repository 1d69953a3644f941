//! Per-exchange chunk interpretation.
//!
//! Each chunk of an exchange is either displayable text or a fragment of
//! a function call. Text is handed back immediately so the caller can
//! show it before the exchange finishes; fragments are folded into a
//! single accumulator that becomes the exchange's call once the stream
//! ends.
//!
//! Only one call per exchange is retained. Fragments that name a
//! different call index than the first one seen are dropped.

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::call::CallDescriptor;
use crate::merge::merge;
use crate::{ChunkStatus, ChunkStream, StreamChunk, TokenUsage};

/// Result of consuming one exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    /// The merged call, if any fragment was seen and the stream completed.
    pub call: Option<CallDescriptor>,
    /// All text emitted during the exchange.
    pub text: String,
    /// Last usage figure reported by the transport.
    pub usage: Option<TokenUsage>,
    /// The transport closed before the exchange completed.
    pub interrupted: bool,
}

/// Classifies chunks and accumulates at most one call.
#[derive(Debug, Default)]
pub struct StreamInterpreter {
    call: Option<CallDescriptor>,
    text: String,
    usage: Option<TokenUsage>,
    skipped: usize,
}

impl StreamInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning the text to emit for it, if any.
    ///
    /// Failed chunks are logged and skipped. A chunk carrying a call
    /// fragment never emits text, even if it also carries a delta.
    pub fn feed(&mut self, chunk: StreamChunk) -> Option<String> {
        if let ChunkStatus::Failed { code, message } = &chunk.status {
            self.skipped += 1;
            warn!(%code, %message, "Skipping failed stream chunk");
            return None;
        }

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        if let Some(fragment) = chunk.call_fragment {
            self.absorb(fragment);
            return None;
        }

        match chunk.text_delta {
            Some(delta) if !delta.is_empty() => {
                self.text.push_str(&delta);
                Some(delta)
            }
            _ => None,
        }
    }

    fn absorb(&mut self, fragment: CallDescriptor) {
        let first_index = self.call.as_ref().and_then(|call| call.index);
        if let (Some(first), Some(incoming)) = (first_index, fragment.index) {
            if first != incoming {
                warn!(first, incoming, "Dropping fragment of a second simultaneous call");
                return;
            }
        }
        self.call = Some(merge(self.call.as_ref(), &fragment));
    }

    /// Text emitted so far in this exchange.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_call(&self) -> bool {
        self.call.is_some()
    }

    /// Number of failed chunks skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The stream ended normally.
    pub fn finish(self) -> Interpretation {
        debug!(
            has_call = self.call.is_some(),
            text_len = self.text.len(),
            skipped = self.skipped,
            "Exchange complete"
        );
        Interpretation {
            call: self.call,
            text: self.text,
            usage: self.usage,
            interrupted: false,
        }
    }

    /// The stream was cut off. Any partial call is discarded.
    pub fn abandon(self) -> Interpretation {
        if self.call.is_some() {
            warn!("Discarding partially assembled call from interrupted stream");
        }
        Interpretation {
            call: None,
            text: self.text,
            usage: self.usage,
            interrupted: true,
        }
    }
}

/// Drain a whole exchange, returning the emitted text pieces in order.
pub async fn interpret(mut stream: ChunkStream) -> (Vec<String>, Interpretation) {
    let mut interpreter = StreamInterpreter::new();
    let mut pieces = Vec::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => pieces.extend(interpreter.feed(chunk)),
            Err(e) => {
                warn!(error = %e, "Stream interrupted");
                return (pieces, interpreter.abandon());
            }
        }
    }

    (pieces, interpreter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AiError;

    fn stream_of(items: Vec<Result<StreamChunk, AiError>>) -> ChunkStream {
        Box::pin(futures_util::stream::iter(items))
    }

    fn indexed(index: u32, name: Option<&str>, arguments: &str) -> CallDescriptor {
        CallDescriptor {
            index: Some(index),
            ..CallDescriptor::fragment(name, Some(arguments))
        }
    }

    #[test]
    fn text_chunks_are_emitted_immediately() {
        let mut interpreter = StreamInterpreter::new();
        assert_eq!(interpreter.feed(StreamChunk::text("Sky")), Some("Sky".into()));
        assert_eq!(interpreter.feed(StreamChunk::text(" is")), Some(" is".into()));
        assert_eq!(interpreter.text(), "Sky is");
        assert!(!interpreter.has_call());
    }

    #[test]
    fn empty_text_delta_emits_nothing() {
        let mut interpreter = StreamInterpreter::new();
        assert_eq!(interpreter.feed(StreamChunk::text("")), None);
        assert_eq!(interpreter.feed(StreamChunk::default()), None);
    }

    #[test]
    fn call_fragment_takes_priority_over_text() {
        let mut interpreter = StreamInterpreter::new();
        let chunk = StreamChunk {
            text_delta: Some("ignored".into()),
            ..StreamChunk::call(CallDescriptor::fragment(Some("get_weather"), Some("{}")))
        };
        assert_eq!(interpreter.feed(chunk), None);
        assert!(interpreter.has_call());
        assert_eq!(interpreter.text(), "");
    }

    #[test]
    fn failed_chunk_is_skipped() {
        let mut interpreter = StreamInterpreter::new();
        let failed = StreamChunk {
            text_delta: Some("garbage".into()),
            ..StreamChunk::failed("InternalError", "upstream hiccup")
        };
        assert_eq!(interpreter.feed(failed), None);
        assert_eq!(interpreter.skipped(), 1);
        assert_eq!(interpreter.finish().text, "");
    }

    #[test]
    fn second_call_index_is_dropped() {
        let mut interpreter = StreamInterpreter::new();
        interpreter.feed(StreamChunk::call(indexed(0, Some("get_weather"), "{\"location\":")));
        interpreter.feed(StreamChunk::call(indexed(1, Some("get_time"), "{}")));
        interpreter.feed(StreamChunk::call(indexed(0, None, "\"Paris\"}")));

        let call = interpreter.finish().call.unwrap();
        assert_eq!(call.name(), Some("get_weather"));
        assert_eq!(call.arguments(), Some("{\"location\":\"Paris\"}"));
    }

    #[test]
    fn usage_keeps_last_report() {
        let mut interpreter = StreamInterpreter::new();
        let usage = |output_tokens| StreamChunk {
            usage: Some(TokenUsage {
                input_tokens: 12,
                output_tokens,
            }),
            ..StreamChunk::text("x")
        };
        interpreter.feed(usage(1));
        interpreter.feed(usage(4));
        assert_eq!(interpreter.finish().usage.unwrap().output_tokens, 4);
    }

    #[tokio::test]
    async fn interpret_collects_text_pieces() {
        let stream = stream_of(vec![
            Ok(StreamChunk::text("Sky")),
            Ok(StreamChunk::failed("Throttling", "retry later")),
            Ok(StreamChunk::text(" is")),
            Ok(StreamChunk::text(" clear.")),
        ]);

        let (pieces, result) = interpret(stream).await;
        assert_eq!(pieces, vec!["Sky", " is", " clear."]);
        assert_eq!(result.text, "Sky is clear.");
        assert!(result.call.is_none());
        assert!(!result.interrupted);
    }

    #[tokio::test]
    async fn interpret_assembles_call_without_text() {
        let stream = stream_of(vec![
            Ok(StreamChunk::call(indexed(0, Some("get_weather"), "{\"loca"))),
            Ok(StreamChunk::call(indexed(0, None, "tion\":\"Beij"))),
            Ok(StreamChunk::call(indexed(0, None, "ing\"}"))),
        ]);

        let (pieces, result) = interpret(stream).await;
        assert!(pieces.is_empty());
        let call = result.call.unwrap().finalize().unwrap();
        assert_eq!(call.arguments, serde_json::json!({"location": "Beijing"}));
    }

    #[tokio::test]
    async fn interrupted_stream_discards_partial_call() {
        let stream = stream_of(vec![
            Ok(StreamChunk::call(indexed(0, Some("get_weather"), "{\"loca"))),
            Err(AiError::NetworkError("connection reset".into())),
            Ok(StreamChunk::text("never seen")),
        ]);

        let (pieces, result) = interpret(stream).await;
        assert!(pieces.is_empty());
        assert!(result.call.is_none());
        assert!(result.interrupted);
    }
}
