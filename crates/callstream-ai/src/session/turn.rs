//! Turn execution: the streaming control loop behind `Session::submit`.
//!
//! A turn is a small state machine driven by `stream::unfold`. Each poll
//! of the returned stream advances it until a text piece is ready or the
//! turn ends, so the transport is never read ahead of the caller.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::call::CallDescriptor;
use crate::interpreter::StreamInterpreter;
use crate::{AiError, ChunkStream, Interpretation, Message};

use super::manager::Session;

/// Lazily produced text pieces of one turn.
///
/// An `Err` item ends the turn; text already yielded stays valid.
pub struct TurnStream<'a> {
    inner: Pin<Box<dyn Stream<Item = Result<String, AiError>> + Send + 'a>>,
}

impl Stream for TurnStream<'_> {
    type Item = Result<String, AiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

enum Phase {
    /// Open the next exchange against the current history.
    AwaitingResponse,
    /// Pull chunks until a text piece is ready or the stream ends.
    Streaming(ChunkStream),
    /// The exchange ended with an assembled call.
    ResolvingCall { call: CallDescriptor, text: String },
    Done,
}

struct TurnState<'a> {
    session: &'a mut Session,
    phase: Phase,
    interpreter: StreamInterpreter,
    /// Calls resolved so far in this turn.
    rounds: u32,
    /// History length before the turn's user message.
    checkpoint: usize,
}

impl TurnState<'_> {
    /// End the turn with `error`, discarding everything it appended.
    fn fail(&mut self, error: AiError) -> AiError {
        warn!(error = %error, rounds = self.rounds, "Turn failed, rolling back history");
        self.session.messages.truncate(self.checkpoint);
        self.phase = Phase::Done;
        error
    }

    fn record_usage(&mut self, interpretation: &Interpretation) {
        if let Some(usage) = interpretation.usage {
            self.session.tracker.record(&self.session.provider, &usage);
        }
    }

    fn resolve(&mut self, call: CallDescriptor, text: String) -> Result<(), AiError> {
        self.rounds += 1;
        if self.rounds > self.session.max_tool_rounds {
            return Err(AiError::ToolRoundsExceeded(self.session.max_tool_rounds));
        }

        let call = call.finalize()?;
        let result = self.session.registry.dispatch(&call)?;
        info!(capability = %call.name, call_id = %call.id, round = self.rounds, "Capability resolved");

        let content = (!text.is_empty()).then_some(text);
        self.session
            .messages
            .push(Message::assistant_call(call.descriptor, content));
        self.session
            .messages
            .push(Message::tool_result(call.name, Some(call.id), result));
        Ok(())
    }
}

impl Session {
    /// Start a turn with `user_text` and stream its visible text.
    ///
    /// The returned stream must be driven to completion for the turn's
    /// history to settle; dropping it early leaves history as of the
    /// last completed step.
    pub fn submit(&mut self, user_text: impl Into<String>) -> TurnStream<'_> {
        let checkpoint = self.messages.len();
        self.messages.push(Message::user(user_text));
        debug!(history = self.messages.len(), "Turn started");

        let state = TurnState {
            session: self,
            phase: Phase::AwaitingResponse,
            interpreter: StreamInterpreter::new(),
            rounds: 0,
            checkpoint,
        };

        let inner = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                match std::mem::replace(&mut state.phase, Phase::Done) {
                    Phase::AwaitingResponse => {
                        let history = state.session.build_messages();
                        let opened = state
                            .session
                            .transport
                            .open_stream(&history, state.session.registry.definitions())
                            .await;
                        match opened {
                            Ok(stream) => {
                                state.interpreter = StreamInterpreter::new();
                                state.phase = Phase::Streaming(stream);
                            }
                            Err(AiError::Timeout) => {
                                warn!("Exchange timed out, ending turn");
                                return None;
                            }
                            Err(e) => {
                                let e = state.fail(e);
                                return Some((Err(e), state));
                            }
                        }
                    }
                    Phase::Streaming(mut stream) => match stream.next().await {
                        Some(Ok(chunk)) => {
                            let piece = state.interpreter.feed(chunk);
                            state.phase = Phase::Streaming(stream);
                            if let Some(piece) = piece {
                                return Some((Ok(piece), state));
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Stream interrupted, ending turn");
                            let interpretation =
                                std::mem::take(&mut state.interpreter).abandon();
                            state.record_usage(&interpretation);
                            return None;
                        }
                        None => {
                            let interpretation = std::mem::take(&mut state.interpreter).finish();
                            state.record_usage(&interpretation);
                            match interpretation.call {
                                Some(call) => {
                                    state.phase = Phase::ResolvingCall {
                                        call,
                                        text: interpretation.text,
                                    };
                                }
                                None => {
                                    state
                                        .session
                                        .messages
                                        .push(Message::assistant_text(interpretation.text));
                                    debug!(
                                        history = state.session.messages.len(),
                                        rounds = state.rounds,
                                        "Turn complete"
                                    );
                                    return None;
                                }
                            }
                        }
                    },
                    Phase::ResolvingCall { call, text } => match state.resolve(call, text) {
                        Ok(()) => state.phase = Phase::AwaitingResponse,
                        Err(e) => {
                            let e = state.fail(e);
                            return Some((Err(e), state));
                        }
                    },
                    Phase::Done => return None,
                }
            }
        });

        TurnStream {
            inner: Box::pin(inner),
        }
    }

    /// Run a whole turn and return its concatenated text.
    pub async fn chat(&mut self, user_text: impl Into<String>) -> Result<String, AiError> {
        let mut turn = self.submit(user_text);
        let mut text = String::new();
        while let Some(piece) = turn.next().await {
            text.push_str(&piece?);
        }
        Ok(text)
    }
}
