//! Name-keyed capability registry and dispatch.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::call::FinalizedCall;
use crate::{AiError, ToolDefinition};

/// Runs a capability against its decoded arguments and returns the text
/// that becomes the tool-result message.
pub type CapabilityHandler =
    Box<dyn Fn(&serde_json::Value) -> Result<String, AiError> + Send + Sync>;

/// Registered capabilities, in registration order.
#[derive(Default)]
pub struct CapabilityRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, CapabilityHandler>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. A later registration under the same name
    /// replaces the earlier one in place.
    pub fn register(&mut self, definition: ToolDefinition, handler: CapabilityHandler) {
        let name = definition.name.clone();
        match self.definitions.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                warn!(capability = %name, "Replacing previously registered capability");
                *existing = definition;
            }
            None => self.definitions.push(definition),
        }
        self.handlers.insert(name, handler);
    }

    /// Register a capability whose arguments decode into `T`.
    ///
    /// Arguments that do not match `T` fail with `ArgumentDecode`.
    pub fn register_typed<T, F>(&mut self, definition: ToolDefinition, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) -> String + Send + Sync + 'static,
    {
        let name = definition.name.clone();
        self.register(
            definition,
            Box::new(move |arguments| {
                let decoded = T::deserialize(arguments).map_err(|e| AiError::ArgumentDecode {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
                Ok(handler(decoded))
            }),
        );
    }

    /// Advertisements for every registered capability.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Decode `arguments_json` and run the capability called `name`.
    pub fn resolve(&self, name: &str, arguments_json: &str) -> Result<String, AiError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| AiError::UnknownCapability(name.to_string()))?;

        let arguments: serde_json::Value =
            serde_json::from_str(arguments_json).map_err(|e| AiError::ArgumentDecode {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        debug!(capability = %name, "Executing capability");
        handler(&arguments)
    }

    /// Run a finalized call whose arguments are already decoded.
    pub fn dispatch(&self, call: &FinalizedCall) -> Result<String, AiError> {
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| AiError::UnknownCapability(call.name.clone()))?;

        debug!(capability = %call.name, call_id = %call.id, "Executing capability");
        handler(&call.arguments)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.definitions.iter().map(|d| d.name.as_str()).collect();
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &names)
            .finish()
    }
}
