//! Streaming tool-call engine for callstream.
//!
//! Provides:
//! - Incremental reassembly of function calls from streamed fragments
//! - A registry of local capabilities the model may invoke
//! - A conversation session that resolves calls and resumes streaming
//!   until a turn ends in plain text
//! - A DashScope streaming transport and a scripted mock transport
//! - Token usage tracking

pub mod call;
pub mod dashscope;
pub mod interpreter;
pub mod merge;
pub mod mock;
pub mod session;
pub mod streaming;
pub mod token_tracker;
pub mod tools;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

pub use call::{CallDescriptor, FinalizedCall, FunctionFragment, FUNCTION_KIND};
pub use dashscope::{DashScopeClient, DashScopeConfig};
pub use interpreter::{Interpretation, StreamInterpreter};
pub use merge::{fold_fragments, merge};
pub use session::{Session, TurnStream};
pub use token_tracker::TokenTracker;
pub use tools::{CapabilityHandler, CapabilityRegistry};

/// Ordered, lazily produced chunks of one network exchange.
///
/// An `Err` item means the transport was cancelled or closed before the
/// exchange completed.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send>>;

/// The network side of a conversation: opens one streamed exchange
/// against the full history and the advertised capabilities.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChunkStream, AiError>;
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallDescriptor>,
    /// Capability name, set on tool-result messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Id of the call a tool-result message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_content(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(Role::User, content)
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, content)
    }

    /// Assistant message carrying a finalized call. Any text the model
    /// produced in the same exchange rides along as content.
    pub fn assistant_call(call: CallDescriptor, content: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            call: Some(call),
            name: None,
            call_id: None,
        }
    }

    pub fn tool_result(
        name: impl Into<String>,
        call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            call: None,
            name: Some(name.into()),
            call_id,
        }
    }

    fn with_content(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            call: None,
            name: None,
            call_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A capability advertisement sent to the model with every exchange.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the capability's arguments.
    pub parameters: serde_json::Value,
}

/// One incremental unit of a streamed response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamChunk {
    pub status: ChunkStatus,
    pub text_delta: Option<String>,
    pub call_fragment: Option<CallDescriptor>,
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text_delta: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn call(fragment: CallDescriptor) -> Self {
        Self {
            call_fragment: Some(fragment),
            ..Self::default()
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ChunkStatus::Failed {
                code: code.into(),
                message: message.into(),
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChunkStatus {
    #[default]
    Ok,
    Failed { code: String, message: String },
}

impl ChunkStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ChunkStatus::Ok)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Timeout")]
    Timeout,
    #[error("Invalid arguments for `{name}`: {message}")]
    ArgumentDecode { name: String, message: String },
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
    #[error("Exceeded {0} chained tool calls in one turn")]
    ToolRoundsExceeded(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn tool_result_message_carries_name_and_id() {
        let msg = Message::tool_result("get_weather", Some("call_1".into()), "sunny");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.name.as_deref(), Some("get_weather"));
        assert_eq!(msg.call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.content.as_deref(), Some("sunny"));
        assert!(msg.call.is_none());
    }

    #[test]
    fn user_message_skips_empty_fields_when_serialized() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn failed_chunk_is_not_ok() {
        let chunk = StreamChunk::failed("Throttling", "slow down");
        assert!(!chunk.status.is_ok());
        assert!(StreamChunk::text("x").status.is_ok());
    }

    #[test]
    fn usage_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u64::MAX,
            output_tokens: 5,
        };
        assert_eq!(usage.total_tokens(), u64::MAX);
    }

    #[test]
    fn error_messages_name_the_capability() {
        let err = AiError::UnknownCapability("get_time".into());
        assert_eq!(err.to_string(), "Unknown capability: get_time");

        let err = AiError::ArgumentDecode {
            name: "get_weather".into(),
            message: "EOF while parsing".into(),
        };
        assert!(err.to_string().contains("get_weather"));
    }
}
