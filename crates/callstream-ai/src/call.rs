//! Call descriptors: the partial-or-complete shape of a function call
//! as it travels through the stream, and its finalized form.

use serde::{Deserialize, Serialize};

use crate::AiError;

/// The only call kind the protocol defines.
pub const FUNCTION_KIND: &str = "function";

/// A (possibly partial) function call as carried by stream chunks.
///
/// While a stream is in flight `function.arguments` is a prefix of the
/// final JSON text and is not expected to parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Position of the call among simultaneous calls in one response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// A fully assembled call with decoded arguments, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    /// The descriptor as it is recorded in history.
    pub descriptor: CallDescriptor,
}

impl CallDescriptor {
    /// Build a descriptor fragment carrying only function fields.
    pub fn fragment(name: Option<&str>, arguments: Option<&str>) -> Self {
        Self {
            function: Some(FunctionFragment {
                name: name.map(String::from),
                arguments: arguments.map(String::from),
            }),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.name.as_deref())
    }

    pub fn arguments(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.arguments.as_deref())
    }

    /// Parse the accumulated argument text and fix the call's identity.
    ///
    /// Absent or blank arguments decode to an empty object. A call the
    /// stream never gave an id receives a generated one so the assistant
    /// and tool messages stay linked.
    pub fn finalize(self) -> Result<FinalizedCall, AiError> {
        let name = self.name().unwrap_or_default().to_string();

        let arguments = match self.arguments().map(str::trim) {
            None | Some("") => serde_json::Value::Object(serde_json::Map::new()),
            Some(text) => {
                serde_json::from_str(text).map_err(|e| AiError::ArgumentDecode {
                    name: name.clone(),
                    message: e.to_string(),
                })?
            }
        };

        let id = match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("call_{}", uuid::Uuid::new_v4().simple()),
        };

        let descriptor = CallDescriptor {
            id: Some(id.clone()),
            kind: Some(FUNCTION_KIND.to_string()),
            ..self
        };

        Ok(FinalizedCall {
            id,
            name,
            arguments,
            descriptor,
        })
    }
}
