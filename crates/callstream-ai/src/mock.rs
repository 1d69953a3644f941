//! Scripted transport for tests.
//!
//! [`ScriptedTransport`] is a queue-based fake: each call to
//! [`open_stream`](ChatTransport::open_stream) pops the next scripted
//! exchange and replays it as a chunk stream, without touching the
//! network. Every call is recorded for later assertion.
//!
//! # Panics
//!
//! `open_stream` panics if the queue is empty, so a test that triggers
//! more exchanges than it scripted fails loudly.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::call::CallDescriptor;
use crate::{AiError, ChatTransport, ChunkStream, Message, StreamChunk, ToolDefinition};

/// What one `open_stream` call observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExchange {
    /// Length of the history passed in, system prompt included.
    pub history_len: usize,
    pub history: Vec<Message>,
    pub tool_names: Vec<String>,
}

enum Script {
    Stream(Vec<Result<StreamChunk, AiError>>),
    OpenError(AiError),
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<RecordedExchange>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an exchange whose chunks all arrive successfully.
    pub fn queue_chunks(&self, chunks: Vec<StreamChunk>) {
        self.queue_items(chunks.into_iter().map(Ok).collect());
    }

    /// Queue an exchange that may include transport errors mid-stream.
    pub fn queue_items(&self, items: Vec<Result<StreamChunk, AiError>>) {
        lock(&self.scripts).push_back(Script::Stream(items));
    }

    /// Queue an exchange that fails before any chunk is produced.
    pub fn queue_open_error(&self, error: AiError) {
        lock(&self.scripts).push_back(Script::OpenError(error));
    }

    /// Builder form of [`queue_chunks`](Self::queue_chunks).
    pub fn with_chunks(self, chunks: Vec<StreamChunk>) -> Self {
        self.queue_chunks(chunks);
        self
    }

    pub fn recorded_calls(&self) -> Vec<RecordedExchange> {
        lock(&self.calls).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.scripts).len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChunkStream, AiError> {
        lock(&self.calls).push(RecordedExchange {
            history_len: history.len(),
            history: history.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let script = lock(&self.scripts)
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedTransport: no exchange queued"));

        match script {
            Script::Stream(items) => Ok(Box::pin(futures_util::stream::iter(items))),
            Script::OpenError(error) => Err(error),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn text_chunk(delta: &str) -> StreamChunk {
    StreamChunk::text(delta)
}

/// A call fragment for call index 0. `id` and `name` are normally only
/// present on the first fragment.
pub fn call_chunk(id: Option<&str>, name: Option<&str>, arguments: &str) -> StreamChunk {
    StreamChunk::call(CallDescriptor {
        id: id.map(String::from),
        index: Some(0),
        kind: Some(crate::FUNCTION_KIND.to_string()),
        ..CallDescriptor::fragment(name, Some(arguments))
    })
}

pub fn failed_chunk(code: &str, message: &str) -> StreamChunk {
    StreamChunk::failed(code, message)
}
