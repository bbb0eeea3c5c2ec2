//! Tool system errors.
//!
//! Every variant here is recoverable: the agent loop renders it as the tool
//! result text and lets the calling agent decide how to proceed.

use thiserror::Error;

/// Errors raised while resolving, validating, or executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name is registered (or the agent may not use it).
    #[error("Tool not found: {name}. Available tools: {available}")]
    ToolNotFound { name: String, available: String },

    /// Arguments do not satisfy the tool's declared parameter contract.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    ToolValidationError { tool: String, message: String },

    /// A tool safety precondition was not met (e.g. read-before-write).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A handoff was attempted from inside a parallel branch.
    #[error(
        "Handoff rejected: you are running inside a parallel branch. \
         Finish your task and return your answer; let the aggregator continue."
    )]
    NestedHandoffRejected,

    /// File system failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure inside a tool body.
    #[error("Tool execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    /// Shorthand for a validation error against `tool`.
    pub fn validation(tool: &str, message: impl Into<String>) -> Self {
        ToolError::ToolValidationError {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Text handed back to the agent as the tool result.
    pub fn to_tool_output(&self) -> String {
        format!("Error: {}", self)
    }
}
