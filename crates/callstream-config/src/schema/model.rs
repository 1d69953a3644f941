use serde::{Deserialize, Serialize};

/// Remote model and transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Streaming generation endpoint. The transport's built-in DashScope
    /// endpoint is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature; the service default is used when unset.
    pub temperature: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "qwen-turbo".into(),
            endpoint: None,
            api_key_env: "DASHSCOPE_API_KEY".into(),
            temperature: None,
        }
    }
}
