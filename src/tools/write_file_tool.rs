//! Write file tool.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base_tool::{required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Tool that creates or overwrites a file.
///
/// Creating a brand-new path is always allowed. Overwriting an existing file
/// requires that the path was read in the current context first.
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    pub name: String,
    pub description: String,
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self {
            name: "write_file".to_string(),
            description: "Write content to a file, creating parent directories as needed. \
                          Overwriting an existing file requires reading it first."
                .to_string(),
        }
    }
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseTool for WriteFileTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path of the file to write" },
                "content": { "type": "string", "description": "Full text content to write" }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = required_str(&self.name, args, "path")?;
        let content = required_str(&self.name, args, "content")?;
        let path = ctx.resolve_path(raw)?;

        let _guard = ctx.lock_writes().await;

        let exists = tokio::fs::try_exists(&path).await?;
        if exists && !ctx.is_marked_read(&path) {
            return Err(ToolError::PreconditionFailed(format!(
                "{} already exists; read it before overwriting it",
                raw
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        ctx.mark_read(&path);

        log::debug!("write_file: {} bytes -> {}", content.len(), path.display());
        let verb = if exists { "Overwrote" } else { "Created" };
        Ok(format!("{} {} ({} bytes)", verb, raw, content.len()))
    }
}
