//! Tools system for agents.
//!
//! This module provides the tool capability trait, the closed set of
//! built-in tools, the per-agency registry, and the [`ToolContext`] whose
//! read-markers and write lock back the file tools' safety preconditions.

pub mod base_tool;
pub mod context;
pub mod edit_tool;
pub mod error;
pub mod glob_tool;
pub mod grep_tool;
pub mod handoff_tool;
pub mod read_file_tool;
pub mod registry;
pub mod schema;
pub mod shell_tool;
pub mod tool_calling;
pub mod write_file_tool;

// Re-exports for convenience
pub use base_tool::{BaseTool, Tool, ToolDefinition};
pub use context::ToolContext;
pub use error::ToolError;
pub use handoff_tool::{HandoffTool, HANDOFF_TOOL_NAME};
pub use registry::{ToolOutput, ToolRegistry};
pub use tool_calling::ToolCall;
