//! Full configuration validation.
//!
//! Validates numeric ranges and required strings, collecting every
//! problem into a single `ConfigError`.

mod helpers;


use crate::schema::CallstreamConfig;
use callstream_common::ConfigError;

use helpers::{validate_non_empty, validate_range, validate_range_f64};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CallstreamConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_non_empty(&mut errors, "model.model", &config.model.model);
    if let Some(ref endpoint) = config.model.endpoint {
        validate_non_empty(&mut errors, "model.endpoint", endpoint);
    }
    validate_non_empty(&mut errors, "model.api_key_env", &config.model.api_key_env);
    if let Some(temperature) = config.model.temperature {
        validate_range_f64(&mut errors, "model.temperature", temperature, 0.0, 2.0);
    }

    validate_range(
        &mut errors,
        "session.max_tool_rounds",
        config.session.max_tool_rounds,
        1,
        64,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
