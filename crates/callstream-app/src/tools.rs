//! Capabilities the CLI exposes to the model.

use callstream_ai::{CapabilityRegistry, ToolDefinition};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: String,
}

/// Canned weather report; stands in for a real lookup.
fn get_weather(args: WeatherArgs) -> String {
    format!("{}, sunny, 25 degree,", args.location)
}

pub fn registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register_typed(
        ToolDefinition {
            name: "get_weather".into(),
            description: "Get the current weather in a given location".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. San Francisco, CA"
                    }
                },
                "required": ["location"]
            }),
        },
        get_weather,
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_capability_is_registered() {
        let registry = registry();
        assert!(registry.contains("get_weather"));
        assert_eq!(registry.definitions()[0].parameters["required"][0], "location");
    }

    #[test]
    fn weather_reports_the_location() {
        let result = registry()
            .resolve("get_weather", r#"{"location":"Beijing"}"#)
            .unwrap();
        assert_eq!(result, "Beijing, sunny, 25 degree,");
    }

    #[test]
    fn weather_without_location_is_rejected() {
        assert!(registry().resolve("get_weather", "{}").is_err());
    }
}
