//! Read file tool.
//!
//! Reading a path is what satisfies the read-before-write precondition of
//! the write and edit tools, so every successful read marks the path in the
//! calling context.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base_tool::{required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Tool for reading a text file, optionally a window of lines.
#[derive(Debug, Clone)]
pub struct ReadFileTool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self {
            name: "read_file".to_string(),
            description: "Read a text file. Returns its contents with 1-based line numbers. \
                          A file must be read before it can be edited or overwritten."
                .to_string(),
        }
    }
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseTool for ReadFileTool {
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
                "path": {
                    "type": "string",
                    "description": "Path of the file to read (relative to the working directory or absolute)"
                },
                "offset": {
                    "type": "integer",
                    "description": "1-based line to start from (optional)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (optional)"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = required_str(&self.name, args, "path")?;
        let path = ctx.resolve_path(raw)?;

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ToolError::Execution(format!("failed to read {}: {}", path.display(), e))
        })?;
        ctx.mark_read(&path);

        let offset = args.get("offset").and_then(Value::as_u64).unwrap_or(1).max(1) as usize;
        let limit = args.get("limit").and_then(Value::as_u64).map(|l| l as usize);

        let lines = content
            .lines()
            .enumerate()
            .skip(offset - 1)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(i, line)| format!("{:>6}\t{}", i + 1, line))
            .collect::<Vec<_>>();

        if lines.is_empty() {
            return Ok(format!("{} is empty (or offset is past the end)", raw));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_marks_path_and_numbers_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "alpha\nbeta\ngamma\n").unwrap();

        let ctx = ToolContext::default();
        let tool = ReadFileTool::new();
        let out = tool
            .execute(&json!({"path": file.to_str().unwrap()}), &ctx)
            .await
            .unwrap();

        assert!(out.contains("     1\talpha"));
        assert!(out.contains("     3\tgamma"));
        assert!(ctx.is_marked_read(&file.canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn test_read_window() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "1\n2\n3\n4\n").unwrap();

        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        let out = ReadFileTool::new()
            .execute(&json!({"path": "a.txt", "offset": 2, "limit": 2}), &ctx)
            .await
            .unwrap();

        assert_eq!(out, "     2\t2\n     3\t3");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_marked() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let ctx = ToolContext::default();

        let err = ReadFileTool::new()
            .execute(&json!({"path": missing.to_str().unwrap()}), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Execution(_)));
        assert!(!ctx.is_marked_read(&ctx.resolve_path(missing.to_str().unwrap()).unwrap()));
    }
}
