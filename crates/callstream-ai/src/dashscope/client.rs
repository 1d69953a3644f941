//! DashScope client struct and request building.

use crate::tools::to_wire_tools;
use crate::{AiError, Message, ToolDefinition};

use super::config::DashScopeConfig;

/// DashScope streaming client.
pub struct DashScopeClient {
    pub(crate) config: DashScopeConfig,
    pub(crate) http: reqwest::Client,
}

impl DashScopeClient {
    pub fn new(config: DashScopeConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Build the JSON request body for one streamed exchange.
    pub(crate) fn build_request_body(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let messages: Vec<_> = history.iter().map(wire_message).collect();

        let mut parameters = serde_json::json!({
            "result_format": "message",
            "incremental_output": true,
        });
        if !tools.is_empty() {
            parameters["tools"] = serde_json::json!(to_wire_tools(tools));
        }
        if let Some(temperature) = self.config.temperature {
            parameters["temperature"] = serde_json::json!(temperature);
        }

        serde_json::json!({
            "model": self.config.model,
            "input": { "messages": messages },
            "parameters": parameters,
        })
    }
}

/// Render a history message in the protocol's expected shape.
///
/// An assistant call goes out as a one-element `tool_calls` list; a tool
/// result carries the capability name and the id of the call it answers.
pub fn wire_message(message: &Message) -> serde_json::Value {
    let mut wire = serde_json::json!({
        "role": message.role,
        "content": message.content.as_deref().unwrap_or(""),
    });
    if let Some(ref call) = message.call {
        wire["tool_calls"] = serde_json::json!([call]);
    }
    if let Some(ref name) = message.name {
        wire["name"] = serde_json::json!(name);
    }
    if let Some(ref call_id) = message.call_id {
        wire["tool_call_id"] = serde_json::json!(call_id);
    }
    wire
}
