//! Base tool definitions.
//!
//! Provides the [`BaseTool`] capability trait every tool implements and the
//! closed [`Tool`] enum the registry stores. New tools are added as new enum
//! variants rather than as open-ended trait objects.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ToolContext;
use super::edit_tool::EditTool;
use super::error::ToolError;
use super::glob_tool::GlobTool;
use super::grep_tool::GrepTool;
use super::handoff_tool::HandoffTool;
use super::read_file_tool::ReadFileTool;
use super::shell_tool::ShellTool;
use super::write_file_tool::WriteFileTool;

// ---------------------------------------------------------------------------
// BaseTool trait
// ---------------------------------------------------------------------------

/// The single capability interface shared by all tools.
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value;

    /// Execute with already-validated arguments.
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

// ---------------------------------------------------------------------------
// Tool definition (what the model sees)
// ---------------------------------------------------------------------------

/// A tool as advertised to the model invocation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

// ---------------------------------------------------------------------------
// Tool enum
// ---------------------------------------------------------------------------

/// Closed set of tool variants known to the registry.
#[derive(Debug, Clone)]
pub enum Tool {
    Shell(ShellTool),
    Read(ReadFileTool),
    Write(WriteFileTool),
    Edit(EditTool),
    Glob(GlobTool),
    Grep(GrepTool),
    Handoff(HandoffTool),
}

impl Tool {
    fn inner(&self) -> &dyn BaseTool {
        match self {
            Tool::Shell(t) => t,
            Tool::Read(t) => t,
            Tool::Write(t) => t,
            Tool::Edit(t) => t,
            Tool::Glob(t) => t,
            Tool::Grep(t) => t,
            Tool::Handoff(t) => t,
        }
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self, Tool::Handoff(_))
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.args_schema(),
        }
    }
}

#[async_trait]
impl BaseTool for Tool {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn description(&self) -> &str {
        self.inner().description()
    }

    fn args_schema(&self) -> Value {
        self.inner().args_schema()
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        self.inner().execute(args, ctx).await
    }
}

impl From<ShellTool> for Tool {
    fn from(t: ShellTool) -> Self {
        Tool::Shell(t)
    }
}

impl From<ReadFileTool> for Tool {
    fn from(t: ReadFileTool) -> Self {
        Tool::Read(t)
    }
}

impl From<WriteFileTool> for Tool {
    fn from(t: WriteFileTool) -> Self {
        Tool::Write(t)
    }
}

impl From<EditTool> for Tool {
    fn from(t: EditTool) -> Self {
        Tool::Edit(t)
    }
}

impl From<GlobTool> for Tool {
    fn from(t: GlobTool) -> Self {
        Tool::Glob(t)
    }
}

impl From<GrepTool> for Tool {
    fn from(t: GrepTool) -> Self {
        Tool::Grep(t)
    }
}

impl From<HandoffTool> for Tool {
    fn from(t: HandoffTool) -> Self {
        Tool::Handoff(t)
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Fetch a required string argument. Validation has already run, so a miss
/// here means the schema and the tool body disagree.
pub(crate) fn required_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::validation(tool, format!("missing required argument '{}'", key)))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub(crate) fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}
