//! Shared error types for the callstream workspace.

pub mod errors;

pub use errors::{CallstreamError, ConfigError};
