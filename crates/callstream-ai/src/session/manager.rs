//! Session struct and conversation management.

use std::sync::Arc;

use crate::token_tracker::TokenTracker;
use crate::tools::CapabilityRegistry;
use crate::{ChatTransport, Message};

/// A conversation session with message history and capability dispatch.
pub struct Session {
    pub(super) transport: Arc<dyn ChatTransport>,
    pub(super) registry: CapabilityRegistry,
    /// Conversation message history, system prompt excluded.
    pub(super) messages: Vec<Message>,
    /// Prepended to every exchange, never stored in history.
    pub(super) system_prompt: Option<String>,
    pub(super) tracker: TokenTracker,
    /// Maximum chained calls resolved in one turn.
    pub(super) max_tool_rounds: u32,
    /// Provider name for token tracking.
    pub(super) provider: String,
}

impl Session {
    pub fn new(transport: Arc<dyn ChatTransport>, registry: CapabilityRegistry) -> Self {
        Self {
            transport,
            registry,
            messages: Vec::new(),
            system_prompt: None,
            tracker: TokenTracker::new(),
            max_tool_rounds: 10,
            provider: "dashscope".to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// History as sent to the transport.
    pub(crate) fn build_messages(&self) -> Vec<Message> {
        let mut msgs = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ref system) = self.system_prompt {
            msgs.push(Message::system(system.clone()));
        }
        msgs.extend(self.messages.iter().cloned());
        msgs
    }

    /// Get the full conversation history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in history.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Clear conversation history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn tracker(&self) -> &TokenTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("messages", &self.messages.len())
            .field("system_prompt", &self.system_prompt.is_some())
            .field("registry", &self.registry)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("provider", &self.provider)
            .finish()
    }
}
