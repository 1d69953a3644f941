//! DashScope client configuration.

use std::fmt;
use std::time::Duration;

/// Default text-generation endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

/// DashScope client configuration.
///
/// The API key is injected by the caller; this crate never reads it
/// from the environment.
#[derive(Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: Option<f64>,
    /// Upper bound on a whole exchange, including the streamed body.
    pub timeout: Duration,
}

impl fmt::Debug for DashScopeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashScopeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DashScopeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "qwen-turbo".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
