//! Local capabilities the model may call.
//!
//! A capability is a [`ToolDefinition`](crate::ToolDefinition) advertised
//! to the model plus a handler that runs when a finished call names it.

mod definitions;
mod registry;

pub use definitions::{to_wire_tool, to_wire_tools};
pub use registry::{CapabilityHandler, CapabilityRegistry};
