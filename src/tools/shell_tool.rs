//! Shell command tool.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::base_tool::{required_str, BaseTool};
use super::context::ToolContext;
use super::error::ToolError;

/// Default command timeout in milliseconds.
pub const DEFAULT_SHELL_TIMEOUT_MS: u64 = 120_000;

/// Output beyond this many characters per stream is cut.
const MAX_STREAM_CHARS: usize = 30_000;

const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "mkfs.",
    "wipefs",
    "dd if=/dev/zero",
    "> /dev/sda",
    ":(){ :|:& };:",
    "shutdown",
    "reboot",
];

/// Run a command through `sh -c` in the working directory.
#[derive(Debug, Clone)]
pub struct ShellTool {
    pub name: String,
    pub description: String,
    /// Timeout applied when the call does not give one.
    pub default_timeout_ms: u64,
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_SHELL_TIMEOUT_MS)
    }
}

impl ShellTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(default_timeout_ms: u64) -> Self {
        Self {
            name: "shell".to_string(),
            description: "Execute a shell command and return its exit status, stdout and stderr. \
                          Commands run one at a time and never alongside a file write."
                .to_string(),
            default_timeout_ms,
        }
    }

    fn is_blocked(command: &str) -> bool {
        let lower = command.to_lowercase();
        BLOCKED_PATTERNS.iter().any(|p| lower.contains(p))
    }
}

#[async_trait]
impl BaseTool for ShellTool {
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
                "command": { "type": "string", "description": "Command line to run" },
                "timeout_ms": { "type": "integer", "description": "Timeout in milliseconds (optional)" }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let command = required_str(&self.name, args, "command")?;
        if Self::is_blocked(command) {
            return Err(ToolError::PreconditionFailed(
                "command matches a blocked destructive pattern".to_string(),
            ));
        }
        let timeout_ms = args
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .unwrap_or(self.default_timeout_ms);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(wd) = ctx.work_dir() {
            cmd.current_dir(wd);
        }

        // A command may write files, so it is arbitrated like write_file.
        let _guard = ctx.lock_writes().await;
        log::debug!("shell: {}", command);
        let child = cmd.spawn()?;
        let output =
            match tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait_with_output())
                .await
            {
                Ok(result) => result?,
                // Dropping the future kills the child (kill_on_drop).
                Err(_) => {
                    return Err(ToolError::Execution(format!(
                        "command timed out after {}ms and was killed",
                        timeout_ms
                    )))
                }
            };

        let stdout = clip(&String::from_utf8_lossy(&output.stdout));
        let stderr = clip(&String::from_utf8_lossy(&output.stderr));
        let status = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        Ok(format!(
            "exit status: {}\nstdout:\n{}\nstderr:\n{}",
            status, stdout, stderr
        ))
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_STREAM_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_STREAM_CHARS).collect();
    format!("{}\n... [output truncated]", kept)
}
