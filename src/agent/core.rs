//! Core Agent struct.
//!
//! An [`Agent`] is a named unit wrapping a model invocation collaborator.
//! One invocation runs the agent's inner loop: ask the model, execute any
//! ordinary tool call through the registry, feed the text back, repeat.
//! The loop ends with a final answer, a handoff request, or the iteration
//! limit.

use std::fmt;
use std::sync::Arc;

use super::error::AgentError;
use super::message::Message;
use super::model::{ModelInvoker, ModelResponse};
use crate::handoff::request::HandoffRequest;
use crate::tools::base_tool::{BaseTool, Tool, ToolDefinition};
use crate::tools::context::ToolContext;
use crate::tools::error::ToolError;
use crate::tools::handoff_tool::HANDOFF_TOOL_NAME;
use crate::tools::registry::{ToolOutput, ToolRegistry};
use crate::tools::tool_calling::ToolCall;

/// Iteration limit used when neither the agent nor the agency sets one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

// ---------------------------------------------------------------------------
// Invocation inputs / outputs
// ---------------------------------------------------------------------------

/// Everything an agent invocation runs against.
#[derive(Debug, Clone, Copy)]
pub struct AgentScope<'a> {
    pub registry: &'a ToolRegistry,
    pub context: &'a ToolContext,
    /// Agents this agent may hand off to.
    pub peers: &'a [String],
    /// Used when the agent has no limit of its own.
    pub max_iterations: u32,
}

/// A handoff that ended an agent's turn, with what is needed to resume it.
#[derive(Debug, Clone)]
pub struct PendingHandoff {
    pub request: HandoffRequest,
    /// The requester's conversation up to and including the handoff call.
    pub conversation: Vec<Message>,
    /// Id of the handoff tool call awaiting its result.
    pub call_id: String,
}

/// How an agent invocation ended.
#[derive(Debug, Clone)]
pub enum AgentTurn {
    /// Plain answer, no pending handoff.
    Final(String),
    Handoff(PendingHandoff),
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Represents an agent in an agency.
#[derive(Clone)]
pub struct Agent {
    /// Unique name; also the handoff address.
    pub name: String,
    /// Declared capability, shown to peers and in the system prompt.
    pub description: String,
    /// Extra system instructions.
    pub instructions: Option<String>,
    /// Tool allowlist (`None` = every registered tool). The handoff tool
    /// is governed by the communication graph, not by this list.
    pub tools: Option<Vec<String>>,
    /// Per-agent iteration limit.
    pub max_iterations: Option<u32>,
    model: Arc<dyn ModelInvoker>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tools", &self.tools)
            .field("max_iterations", &self.max_iterations)
            .field("model", &self.model)
            .finish()
    }
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        model: Arc<dyn ModelInvoker>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: None,
            tools: None,
            max_iterations: None,
            model,
        }
    }

    /// Builder: set extra system instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Builder: restrict the agent to the named tools.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: set the iteration limit.
    pub fn with_max_iterations(mut self, limit: u32) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Start a fresh invocation with `input` as the user message.
    pub async fn start(&self, input: &str, scope: AgentScope<'_>) -> Result<AgentTurn, AgentError> {
        let conversation = vec![Message::system(self.system_prompt(&scope)), Message::user(input)];
        self.drive(conversation, scope).await
    }

    /// Resume a turn that ended in a handoff, delivering `tool_output` as the
    /// handoff call's result.
    pub async fn resume(
        &self,
        pending: PendingHandoff,
        tool_output: &str,
        scope: AgentScope<'_>,
    ) -> Result<AgentTurn, AgentError> {
        let mut conversation = pending.conversation;
        conversation.push(Message::tool_result(pending.call_id, tool_output));
        self.drive(conversation, scope).await
    }

    async fn drive(
        &self,
        mut conversation: Vec<Message>,
        scope: AgentScope<'_>,
    ) -> Result<AgentTurn, AgentError> {
        let limit = self.max_iterations.unwrap_or(scope.max_iterations);
        let tools = self.tool_definitions(&scope);

        for iteration in 1..=limit {
            let response = self
                .model
                .invoke(&conversation, &tools)
                .await
                .map_err(|source| AgentError::Model {
                    agent: self.name.clone(),
                    source,
                })?;

            let call = match response {
                ModelResponse::FinalAnswer(text) => {
                    log::debug!("{} answered after {} iteration(s)", self.name, iteration);
                    conversation.push(Message::assistant(text.clone()));
                    return Ok(AgentTurn::Final(text));
                }
                ModelResponse::ToolCall(call) => call,
            };

            conversation.push(Message::assistant_tool_call(call.clone()));
            match self.call_tool(&call, &scope).await {
                Ok(ToolOutput::Text(text)) => {
                    conversation.push(Message::tool_result(call.id, text));
                }
                Ok(ToolOutput::Handoff(request)) => {
                    log::debug!("{} requested handoff {}", self.name, request.summary());
                    return Ok(AgentTurn::Handoff(PendingHandoff {
                        request,
                        conversation,
                        call_id: call.id,
                    }));
                }
                Err(err) => {
                    log::debug!("{} tool '{}' failed: {}", self.name, call.name, err);
                    conversation.push(Message::tool_result(call.id, err.to_tool_output()));
                }
            }
        }

        Err(AgentError::MaxIterations {
            agent: self.name.clone(),
            limit,
        })
    }

    async fn call_tool(&self, call: &ToolCall, scope: &AgentScope<'_>) -> Result<ToolOutput, ToolError> {
        if call.name != HANDOFF_TOOL_NAME && !self.allows(&call.name) {
            return Err(ToolError::ToolNotFound {
                name: call.name.clone(),
                available: self
                    .tool_definitions(scope)
                    .into_iter()
                    .map(|d| d.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        scope.registry.dispatch(&self.name, call, scope.context).await
    }

    fn allows(&self, tool_name: &str) -> bool {
        match self.tools {
            Some(ref allowed) => allowed.iter().any(|t| t == tool_name),
            None => true,
        }
    }

    /// Tools offered to the model for this invocation.
    pub fn tool_definitions(&self, scope: &AgentScope<'_>) -> Vec<ToolDefinition> {
        let offer_handoff = !scope.peers.is_empty() && !scope.context.is_parallel_branch();
        scope.registry.definitions_where(|tool: &Tool| {
            if tool.is_handoff() {
                offer_handoff
            } else {
                self.allows(tool.name())
            }
        })
    }

    fn system_prompt(&self, scope: &AgentScope<'_>) -> String {
        let mut prompt = format!("You are {}. {}", self.name, self.description);
        if let Some(ref extra) = self.instructions {
            prompt.push_str("\n\n");
            prompt.push_str(extra);
        }
        if scope.context.is_parallel_branch() {
            prompt.push_str(
                "\n\nYou are running as one branch of a parallel handoff. Complete your part \
                 and answer directly; handoffs are not available here.",
            );
        } else if !scope.peers.is_empty() {
            prompt.push_str(&format!(
                "\n\nYou may hand off to: {}. Use the `{}` tool to do so.",
                scope.peers.join(", "),
                HANDOFF_TOOL_NAME
            ));
        }
        prompt
    }
}
