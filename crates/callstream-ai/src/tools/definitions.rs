//! Wire format of capability advertisements.

use crate::ToolDefinition;

/// Convert a tool definition to the function-calling wire format.
pub fn to_wire_tool(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Convert an ordered list of definitions, preserving order.
pub fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools.iter().map(to_wire_tool).collect()
}
