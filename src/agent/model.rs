//! Model invocation collaborator.
//!
//! The service that turns a conversation into either a final answer or a
//! tool call is external to the orchestration engine. Provider selection,
//! retries and backoff are entirely its concern; from the agent's point of
//! view one `invoke` is one opaque, blocking step.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::tools::base_tool::ToolDefinition;
use crate::tools::tool_calling::ToolCall;

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ModelResponse {
    FinalAnswer(String),
    ToolCall(ToolCall),
}

/// Abstract model invocation service, one per agent.
#[async_trait]
pub trait ModelInvoker: Send + Sync + fmt::Debug {
    /// Produce the next step for `conversation`, given the tools on offer.
    async fn invoke(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> anyhow::Result<ModelResponse>;
}
