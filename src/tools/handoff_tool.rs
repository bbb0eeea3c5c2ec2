//! Handoff pseudo-tool.
//!
//! Lets an agent transfer control to one or more peers. The tool itself does
//! not dispatch anything: it turns validated arguments into a
//! [`HandoffRequest`] that ends the agent's turn. The parallel-branch check
//! lives here, below the agent, so no amount of agent reasoning can get a
//! nested handoff past it.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base_tool::BaseTool;
use super::context::ToolContext;
use super::error::ToolError;
use crate::handoff::request::{HandoffArgs, HandoffRequest};

/// Registry name of the handoff pseudo-tool.
pub const HANDOFF_TOOL_NAME: &str = "handoff";

/// Tool for handing control to other agents.
#[derive(Debug, Clone)]
pub struct HandoffTool {
    pub name: String,
    pub description: String,
}

impl Default for HandoffTool {
    fn default() -> Self {
        Self {
            name: HANDOFF_TOOL_NAME.to_string(),
            description: "Transfer control to other agents. One target runs sequentially and \
                          takes over the conversation; two or more targets run in parallel and \
                          their merged results go to the aggregation target (default: you). \
                          The input should contain ALL context the targets need."
                .to_string(),
        }
    }
}

impl HandoffTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a handoff call by `caller` into a request.
    pub fn request(
        &self,
        caller: &str,
        args: &Value,
        ctx: &ToolContext,
    ) -> Result<HandoffRequest, ToolError> {
        if ctx.is_parallel_branch() {
            log::warn!("{} attempted a handoff from inside a parallel branch", caller);
            return Err(ToolError::NestedHandoffRejected);
        }
        let parsed: HandoffArgs = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::validation(&self.name, e.to_string()))?;
        HandoffRequest::from_args(caller, parsed).map_err(|msg| ToolError::validation(&self.name, msg))
    }
}

#[async_trait]
impl BaseTool for HandoffTool {
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
                "targets": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Names of the agents to hand off to"
                },
                "message": {
                    "type": "string",
                    "description": "The task and all necessary context for the targets"
                },
                "mode": {
                    "type": "string",
                    "enum": ["sequential", "parallel"],
                    "description": "sequential for one target, parallel for two or more (inferred when omitted)"
                },
                "aggregationTarget": {
                    "type": "string",
                    "description": "Agent that receives the merged parallel results (default: you)"
                }
            },
            "required": ["targets", "message"],
            "additionalProperties": false
        })
    }

    /// Text form of the call: validates exactly like [`HandoffTool::request`]
    /// and acknowledges the request.
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        // The caller is unknown through the plain text contract.
        let request = self.request("agent", args, ctx)?;
        Ok(format!(
            "Handoff requested to [{}] ({})",
            request.targets.join(", "),
            request.mode
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::request::HandoffMode;

    #[test]
    fn test_request_from_root_context() {
        let req = HandoffTool::new()
            .request(
                "Coder",
                &json!({"targets": ["Planner", "Critic"], "message": "review", "aggregationTarget": "Coder"}),
                &ToolContext::default(),
            )
            .unwrap();
        assert_eq!(req.from_agent, "Coder");
        assert_eq!(req.mode, HandoffMode::Parallel);
        assert_eq!(req.aggregation_target.as_deref(), Some("Coder"));
    }

    #[test]
    fn test_branch_context_always_rejects() {
        let branch = ToolContext::default().fork();
        let tool = HandoffTool::new();
        for args in [
            json!({"targets": ["Critic"], "message": "check"}),
            json!({"targets": ["Nobody"], "message": "check"}),
            json!({"targets": [], "message": ""}),
        ] {
            let err = tool.request("Planner", &args, &branch).unwrap_err();
            assert!(matches!(err, ToolError::NestedHandoffRejected));
        }
    }

    #[tokio::test]
    async fn test_text_contract_acknowledges() {
        let out = HandoffTool::new()
            .execute(&json!({"targets": ["Planner"], "message": "plan"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "Handoff requested to [Planner] (sequential)");
    }

    #[test]
    fn test_invalid_mode_combination_is_validation_error() {
        let err = HandoffTool::new()
            .request(
                "Coder",
                &json!({"targets": ["Planner"], "message": "m", "mode": "parallel"}),
                &ToolContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolValidationError { .. }));
    }
}
