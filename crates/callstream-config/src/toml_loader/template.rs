//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# callstream configuration
# Only override what you want to change -- missing fields use defaults.

[model]
model = "qwen-turbo"
# endpoint = "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
# The API key is never stored here; it is read from this environment variable.
api_key_env = "DASHSCOPE_API_KEY"
# temperature = 0.7      # 0.0-2.0

[session]
# system_prompt = "You are a helpful assistant."
max_tool_rounds = 10     # 1-64
"##
    .to_string()
}
