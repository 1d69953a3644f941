//! Conversation session management.
//!
//! A `Session` holds the conversation history and drives turns: it
//! streams each exchange's text to the caller, resolves the call an
//! exchange ends with, and resumes streaming until the turn settles on
//! plain text.

mod manager;
mod turn;

pub use manager::Session;
pub use turn::TurnStream;
