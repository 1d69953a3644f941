//! Configuration schema types for callstream.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod model;
mod session;

pub use model::*;
pub use session::*;

use serde::{Deserialize, Serialize};

/// Root configuration for callstream.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallstreamConfig {
    pub model: ModelConfig,
    pub session: SessionConfig,
}
