//! Exact-string edit tool.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base_tool::{optional_bool, required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Replace `old_string` with `new_string` in a file that was read in the
/// current context. By default the match must be unique.
#[derive(Debug, Clone)]
pub struct EditTool {
    pub name: String,
    pub description: String,
}

impl Default for EditTool {
    fn default() -> Self {
        Self {
            name: "edit".to_string(),
            description: "Replace an exact string in a file. old_string must match exactly once \
                          unless replace_all is true. The file must have been read first."
                .to_string(),
        }
    }
}

impl EditTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseTool for EditTool {
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
                "path": { "type": "string", "description": "Path of the file to edit" },
                "old_string": { "type": "string", "description": "Exact text to replace" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": {
                    "type": "boolean",
                    "description": "Replace every occurrence (default false: require a unique match)"
                }
            },
            "required": ["path", "old_string", "new_string"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = required_str(&self.name, args, "path")?;
        let old_string = required_str(&self.name, args, "old_string")?;
        let new_string = required_str(&self.name, args, "new_string")?;
        let replace_all = optional_bool(args, "replace_all").unwrap_or(false);
        let path = ctx.resolve_path(raw)?;

        if !ctx.is_marked_read(&path) {
            return Err(ToolError::PreconditionFailed(format!(
                "{} has not been read in this context; read it before editing",
                raw
            )));
        }
        if old_string.is_empty() {
            return Err(ToolError::validation(&self.name, "old_string must not be empty"));
        }
        if old_string == new_string {
            return Err(ToolError::validation(
                &self.name,
                "old_string and new_string are identical",
            ));
        }

        let _guard = ctx.lock_writes().await;

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ToolError::Execution(format!("failed to read {}: {}", path.display(), e))
        })?;
        let count = content.matches(old_string).count();
        if count == 0 {
            return Err(ToolError::Execution(format!(
                "old_string not found in {}",
                raw
            )));
        }
        if count > 1 && !replace_all {
            return Err(ToolError::Execution(format!(
                "old_string matches {} times in {}; add surrounding context or set replace_all",
                count, raw
            )));
        }

        let updated = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };
        tokio::fs::write(&path, updated).await?;

        Ok(format!("Replaced {} occurrence(s) in {}", count, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::read_file_tool::ReadFileTool;

    fn fixture(body: &str) -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), body).unwrap();
        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        (dir, ctx)
    }

    async fn read(ctx: &ToolContext) {
        ReadFileTool::new()
            .execute(&json!({"path": "main.rs"}), ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_edit_before_read_fails_then_succeeds_after_read() {
        let (dir, ctx) = fixture("fn main() { old(); }");
        let args = json!({"path": "main.rs", "old_string": "old()", "new_string": "new()"});

        let err = EditTool::new().execute(&args, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::PreconditionFailed(_)));

        read(&ctx).await;
        EditTool::new().execute(&args, &ctx).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.rs")).unwrap(),
            "fn main() { new(); }"
        );
    }

    #[tokio::test]
    async fn test_ambiguous_match_needs_replace_all() {
        let (dir, ctx) = fixture("x x x");
        read(&ctx).await;

        let err = EditTool::new()
            .execute(&json!({"path": "main.rs", "old_string": "x", "new_string": "y"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("matches 3 times"));

        let out = EditTool::new()
            .execute(
                &json!({"path": "main.rs", "old_string": "x", "new_string": "y", "replace_all": true}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("3 occurrence"));
        assert_eq!(std::fs::read_to_string(dir.path().join("main.rs")).unwrap(), "y y y");
    }

    #[tokio::test]
    async fn test_read_in_fork_does_not_satisfy_parent() {
        let (_dir, parent) = fixture("a");
        let branch = parent.fork();
        read(&branch).await;

        let args = json!({"path": "main.rs", "old_string": "a", "new_string": "b"});
        let err = EditTool::new().execute(&args, &parent).await.unwrap_err();
        assert!(matches!(err, ToolError::PreconditionFailed(_)));
        EditTool::new().execute(&args, &branch).await.unwrap();
    }
}
