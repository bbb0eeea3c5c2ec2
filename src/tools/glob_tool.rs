//! Glob file-search tool.

use std::path::{Component, Path};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base_tool::{optional_str, required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Maximum number of paths returned by one search.
pub const MAX_GLOB_RESULTS: usize = 200;

/// Find files by glob pattern (`**` recursion, `*`, `?`).
#[derive(Debug, Clone)]
pub struct GlobTool {
    pub name: String,
    pub description: String,
}

impl Default for GlobTool {
    fn default() -> Self {
        Self {
            name: "glob".to_string(),
            description: "Find files matching a glob pattern such as '**/*.rs'. \
                          Supports ** recursion, * and ? wildcards."
                .to_string(),
        }
    }
}

impl GlobTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseTool for GlobTool {
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
                "pattern": { "type": "string", "description": "Glob pattern, e.g. 'src/**/*.rs'" },
                "base_dir": {
                    "type": "string",
                    "description": "Directory to search from (optional, defaults to the working directory)"
                }
            },
            "required": ["pattern"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let pattern = required_str(&self.name, args, "pattern")?;
        let escapes = Path::new(pattern)
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes {
            return Err(ToolError::PreconditionFailed(format!(
                "glob pattern {} must stay below the search directory",
                pattern
            )));
        }
        let base = ctx.resolve_path(optional_str(args, "base_dir").unwrap_or("."))?;

        let full_pattern = format!("{}/{}", base.display(), pattern);
        let entries = glob::glob(&full_pattern)
            .map_err(|e| ToolError::validation(&self.name, format!("bad pattern: {}", e)))?;

        // Matches reached through a symlink that leaves the work dir are dropped.
        let mut paths: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|p| ctx.contains(p))
            .map(|p| {
                p.strip_prefix(&base)
                    .map(|rel| rel.to_string_lossy().to_string())
                    .unwrap_or_else(|_| p.to_string_lossy().to_string())
            })
            .collect();
        paths.sort();

        let total = paths.len();
        paths.truncate(MAX_GLOB_RESULTS);
        let mut out = format!("Found {} file(s)", total);
        if total > MAX_GLOB_RESULTS {
            out.push_str(&format!(" (showing first {})", MAX_GLOB_RESULTS));
        }
        out.push(':');
        for p in paths {
            out.push('\n');
            out.push_str(&p);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_glob_lists_relative_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/bin")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/bin/main.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        let out = GlobTool::new()
            .execute(&json!({"pattern": "**/*.rs"}), &ctx)
            .await
            .unwrap();

        assert!(out.starts_with("Found 2 file(s):"));
        assert!(out.contains("src/bin/main.rs"));
        assert!(out.contains("src/lib.rs"));
        assert!(!out.contains("README.md"));
    }

    #[tokio::test]
    async fn test_pattern_cannot_leave_work_dir() {
        let outer = tempfile::tempdir().unwrap();
        let work = outer.path().join("work");
        std::fs::create_dir(&work).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "").unwrap();

        let ctx = ToolContext::new(Some(work));
        for pattern in ["../*.txt", "src/../../*.txt", "/etc/*"] {
            let err = GlobTool::new()
                .execute(&json!({"pattern": pattern}), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::PreconditionFailed(_)), "{}", pattern);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_matches_outside_work_dir_dropped() {
        let outer = tempfile::tempdir().unwrap();
        let work = outer.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let elsewhere = outer.path().join("elsewhere");
        std::fs::create_dir(&elsewhere).unwrap();
        std::fs::write(elsewhere.join("secret.txt"), "").unwrap();
        std::fs::write(work.join("own.txt"), "").unwrap();
        std::os::unix::fs::symlink(&elsewhere, work.join("link")).unwrap();

        let ctx = ToolContext::new(Some(work));
        let out = GlobTool::new()
            .execute(&json!({"pattern": "**/*.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Found 1 file(s):\nown.txt");
    }

    #[tokio::test]
    async fn test_bad_pattern_is_validation_error() {
        let ctx = ToolContext::default();
        let err = GlobTool::new()
            .execute(&json!({"pattern": "[unclosed"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolValidationError { .. }));
    }
}
