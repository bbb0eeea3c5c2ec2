//! Tool calling data structures.
//!
//! Provides the [`ToolCall`] struct used to represent a model's request to
//! invoke a tool with its name and arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Represents a tool call with its name and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the call with its result in the conversation.
    pub id: String,
    /// The name of the tool to be called.
    pub name: String,
    /// Arguments object passed to the tool.
    pub args: Value,
}

impl ToolCall {
    /// Create a new `ToolCall` with a fresh id.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            args,
        }
    }
}
