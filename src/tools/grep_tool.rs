//! Content search tool.

use std::path::Path;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::base_tool::{optional_bool, optional_str, required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Maximum number of matching lines returned by one search.
pub const MAX_GREP_MATCHES: usize = 200;

/// Regex search over a file or a directory tree.
#[derive(Debug, Clone)]
pub struct GrepTool {
    pub name: String,
    pub description: String,
}

impl Default for GrepTool {
    fn default() -> Self {
        Self {
            name: "grep".to_string(),
            description: "Search file contents with a regular expression. \
                          Searches one file or every text file under a directory."
                .to_string(),
        }
    }
}

impl GrepTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseTool for GrepTool {
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
                "pattern": { "type": "string", "description": "Regular expression" },
                "path": {
                    "type": "string",
                    "description": "File or directory to search (optional, defaults to the working directory)"
                },
                "case_insensitive": { "type": "boolean", "description": "Ignore case (default false)" }
            },
            "required": ["pattern"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let pattern = required_str(&self.name, args, "pattern")?;
        let root = ctx.resolve_path(optional_str(args, "path").unwrap_or("."))?;
        let re = RegexBuilder::new(pattern)
            .case_insensitive(optional_bool(args, "case_insensitive").unwrap_or(false))
            .build()
            .map_err(|e| ToolError::validation(&self.name, format!("bad regex: {}", e)))?;

        // Directory walks are blocking; keep them off the async workers.
        let (matches, truncated) = tokio::task::spawn_blocking(move || search(&re, &root))
            .await
            .map_err(|e| ToolError::Execution(format!("search task failed: {}", e)))?;

        let mut out = format!("Found {} match(es)", matches.len());
        if truncated {
            out.push_str(&format!(" (stopped at {})", MAX_GREP_MATCHES));
        }
        out.push(':');
        for line in matches {
            out.push('\n');
            out.push_str(&line);
        }
        Ok(out)
    }
}

fn search(re: &Regex, root: &Path) -> (Vec<String>, bool) {
    let mut matches = Vec::new();
    let files = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file());

    for entry in files {
        // Unreadable or non-UTF-8 files are skipped.
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let shown = entry
            .path()
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(entry.path());
        for (i, line) in content.lines().enumerate() {
            if re.is_match(line) {
                if matches.len() == MAX_GREP_MATCHES {
                    return (matches, true);
                }
                matches.push(format!("{}:{}:{}", shown.display(), i + 1, line));
            }
        }
    }
    (matches, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grep_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.rs"), "fn alpha() {}\n// TODO tidy\n").unwrap();
        std::fs::write(dir.path().join("src/b.rs"), "fn beta() {}\n").unwrap();

        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        let out = GrepTool::new()
            .execute(&json!({"pattern": "^fn \\w+"}), &ctx)
            .await
            .unwrap();

        assert!(out.starts_with("Found 2 match(es):"));
        assert!(out.contains("src/a.rs:1:fn alpha() {}"));
        assert!(out.contains("src/b.rs:1:fn beta() {}"));
    }

    #[tokio::test]
    async fn test_grep_single_file_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "Hello\nhello\nbye\n").unwrap();

        let ctx = ToolContext::default();
        let out = GrepTool::new()
            .execute(
                &json!({"pattern": "HELLO", "path": file.to_str().unwrap(), "case_insensitive": true}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(out.starts_with("Found 2 match(es):"));
    }

    #[tokio::test]
    async fn test_bad_regex_is_validation_error() {
        let err = GrepTool::new()
            .execute(&json!({"pattern": "(unclosed"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolValidationError { .. }));
    }
}
