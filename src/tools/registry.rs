//! Name-keyed tool registry.
//!
//! Resolves a tool name to its [`Tool`] variant, validates arguments against
//! the declared contract and executes. One registry is owned by each
//! `Agency`; there is no process-wide tool table.

use std::collections::HashMap;

use serde_json::Value;

use super::base_tool::{BaseTool, Tool, ToolDefinition};
use super::context::ToolContext;
use super::edit_tool::EditTool;
use super::error::ToolError;
use super::glob_tool::GlobTool;
use super::grep_tool::GrepTool;
use super::handoff_tool::{HandoffTool, HANDOFF_TOOL_NAME};
use super::read_file_tool::ReadFileTool;
use super::schema::validate_args;
use super::shell_tool::{ShellTool, DEFAULT_SHELL_TIMEOUT_MS};
use super::tool_calling::ToolCall;
use super::write_file_tool::WriteFileTool;
use crate::handoff::request::HandoffRequest;

/// Result of dispatching a tool call on behalf of an agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Ordinary tool text, fed back to the model.
    Text(String),
    /// The call was a valid handoff; the agent's turn ends here.
    Handoff(HandoffRequest),
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool, shell timeout at its default.
    pub fn with_default_tools() -> Self {
        Self::with_shell_timeout(DEFAULT_SHELL_TIMEOUT_MS)
    }

    pub fn with_shell_timeout(shell_timeout_ms: u64) -> Self {
        let mut registry = Self::new();
        registry.register(ShellTool::with_timeout(shell_timeout_ms));
        registry.register(ReadFileTool::new());
        registry.register(WriteFileTool::new());
        registry.register(EditTool::new());
        registry.register(GlobTool::new());
        registry.register(GrepTool::new());
        registry.register(HandoffTool::new());
        registry
    }

    /// Add a tool by name. Re-registering a name replaces the previous tool.
    pub fn register(&mut self, tool: impl Into<Tool>) {
        let tool = tool.into();
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            log::debug!("tool '{}' re-registered; previous definition replaced", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn has_handoff_tool(&self) -> bool {
        self.tools.values().any(Tool::is_handoff)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions of all tools accepted by `allow`, sorted by name.
    pub fn definitions_where(&self, allow: impl Fn(&Tool) -> bool) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .filter(|t| allow(t))
            .map(Tool::definition)
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions_where(|_| true)
    }

    fn resolve(&self, name: &str) -> Result<&Tool, ToolError> {
        self.tools.get(name).ok_or_else(|| ToolError::ToolNotFound {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    fn validated(&self, name: &str, args: &Value) -> Result<&Tool, ToolError> {
        let tool = self.resolve(name)?;
        validate_args(&tool.args_schema(), args).map_err(|msg| ToolError::validation(name, msg))?;
        Ok(tool)
    }

    /// Execute a tool through its text contract.
    pub async fn execute(&self, name: &str, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let tool = self.validated(name, args)?;
        tool.execute(args, ctx).await
    }

    /// Execute a model-issued call for `caller`. Handoff calls become
    /// [`ToolOutput::Handoff`] instead of text.
    pub async fn dispatch(
        &self,
        caller: &str,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        // Branch contexts reject handoffs before anything else is looked at.
        if call.name == HANDOFF_TOOL_NAME && ctx.is_parallel_branch() {
            return Err(ToolError::NestedHandoffRejected);
        }
        let tool = self.validated(&call.name, &call.args)?;
        match tool {
            Tool::Handoff(handoff) => handoff.request(caller, &call.args, ctx).map(ToolOutput::Handoff),
            other => other.execute(&call.args, ctx).await.map(ToolOutput::Text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_registry_has_closed_tool_set() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(
            registry.names(),
            vec!["edit", "glob", "grep", "handoff", "read_file", "shell", "write_file"]
        );
        assert!(registry.has_handoff_tool());
        assert_eq!(registry.definitions().len(), 7);
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ToolRegistry::new();
        registry.register(ShellTool::with_timeout(10));
        registry.register(ShellTool::with_timeout(99));
        match registry.get("shell") {
            Some(Tool::Shell(shell)) => assert_eq!(shell.default_timeout_ms, 99),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(registry.names().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry
            .execute("teleport", &json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolNotFound { .. }));
        assert!(err.to_string().contains("read_file"));
    }

    #[tokio::test]
    async fn test_arguments_validated_before_execution() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry
            .execute("write_file", &json!({"path": "x.txt"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolValidationError { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_turns_handoff_into_request() {
        let registry = ToolRegistry::with_default_tools();
        let call = ToolCall::new("handoff", json!({"targets": ["Planner"], "message": "plan it"}));
        let out = registry.dispatch("Coder", &call, &ToolContext::default()).await.unwrap();
        match out {
            ToolOutput::Handoff(req) => {
                assert_eq!(req.from_agent, "Coder");
                assert_eq!(req.targets, vec!["Planner"]);
            }
            other => panic!("expected handoff, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_handoff_accepts_only_schema_keys() {
        let registry = ToolRegistry::with_default_tools();
        let ctx = ToolContext::default();

        let camel = ToolCall::new(
            "handoff",
            json!({"targets": ["Planner", "Critic"], "message": "m", "aggregationTarget": "Coder"}),
        );
        match registry.dispatch("Coder", &camel, &ctx).await.unwrap() {
            ToolOutput::Handoff(req) => assert_eq!(req.aggregation_target.as_deref(), Some("Coder")),
            other => panic!("expected handoff, got {:?}", other),
        }

        let snake = ToolCall::new(
            "handoff",
            json!({"targets": ["Planner", "Critic"], "message": "m", "aggregation_target": "Coder"}),
        );
        let err = registry.dispatch("Coder", &snake, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::ToolValidationError { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_handoff_in_branch_even_when_malformed() {
        let registry = ToolRegistry::with_default_tools();
        let branch = ToolContext::default().fork();
        let call = ToolCall::new("handoff", json!({"bogus": 1}));
        let err = registry.dispatch("Planner", &call, &branch).await.unwrap_err();
        assert!(matches!(err, ToolError::NestedHandoffRejected));
    }

    #[tokio::test]
    async fn test_dispatch_plain_tool_returns_text() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        let registry = ToolRegistry::with_default_tools();
        let call = ToolCall::new("write_file", json!({"path": "n.txt", "content": "x"}));
        let out = registry.dispatch("Coder", &call, &ctx).await.unwrap();
        assert_eq!(out, ToolOutput::Text("Created n.txt (1 bytes)".to_string()));
    }
}
