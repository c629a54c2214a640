//! Request types for the reasoning port.
//!
//! QueryGate does not prescribe prompt wording; these types only carry the
//! text and tell the port which loop stage is asking.

use serde::{Deserialize, Serialize};

/// The loop stage issuing a reasoning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planner,
    Decider,
    Reflector,
}

/// A prompt sent to the reasoning port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub stage: Stage,
    pub system: String,
    pub user: String,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Ask the model for a single JSON object.
    pub json_mode: bool,
}

impl CompletionOptions {
    pub fn json() -> Self {
        Self { json_mode: true }
    }
}
