use serde::{Deserialize, Serialize};

/// Conversation session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prepended to every exchange as a system message.
    pub system_prompt: Option<String>,
    /// Maximum chained tool calls resolved within one turn.
    pub max_tool_rounds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_rounds: 10,
        }
    }
}
