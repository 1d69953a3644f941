//! Alibaba Cloud DashScope streaming client.
//!
//! Implements [`ChatTransport`](crate::ChatTransport) against the
//! DashScope text-generation API with `result_format = "message"` and
//! incremental output, so every SSE event carries only the new delta.

mod api;
mod client;
mod config;

pub use api::decode_event;
pub use client::{wire_message, DashScopeClient};
pub use config::{DashScopeConfig, DEFAULT_ENDPOINT};
