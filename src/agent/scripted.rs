//! Scripted model invoker.
//!
//! Plays back a fixed list of steps, one per invocation. Used by the test
//! suite and the demo binary to drive deterministic agent behavior without a
//! real model provider.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::message::Message;
use super::model::{ModelInvoker, ModelResponse};
use crate::tools::base_tool::ToolDefinition;
use crate::tools::handoff_tool::HANDOFF_TOOL_NAME;
use crate::tools::tool_calling::ToolCall;

#[derive(Debug, Clone)]
enum Step {
    Answer(String),
    /// Answer with the content of the latest message.
    Echo,
    Call { name: String, args: Value },
    Fail(String),
}

/// A [`ModelInvoker`] that replays scripted steps in order.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    delay: Option<Duration>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn answer(self, text: impl Into<String>) -> Self {
        self.push(Step::Answer(text.into()))
    }

    /// Answer by repeating the latest message (user input or tool result).
    pub fn echo(self) -> Self {
        self.push(Step::Echo)
    }

    pub fn tool_call(self, name: impl Into<String>, args: Value) -> Self {
        self.push(Step::Call {
            name: name.into(),
            args,
        })
    }

    /// Call the handoff tool; one target means sequential, more means parallel.
    pub fn handoff<I, S>(self, targets: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        self.tool_call(
            HANDOFF_TOOL_NAME,
            json!({ "targets": targets, "message": message.into() }),
        )
    }

    /// Parallel handoff with an explicit aggregation target.
    pub fn handoff_aggregated<I, S>(
        self,
        targets: I,
        message: impl Into<String>,
        aggregation_target: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        self.tool_call(
            HANDOFF_TOOL_NAME,
            json!({
                "targets": targets,
                "message": message.into(),
                "mode": "parallel",
                "aggregationTarget": aggregation_target.into(),
            }),
        )
    }

    /// Make the invocation itself fail.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.push(Step::Fail(reason.into()))
    }

    /// Every conversation this model was invoked with, in call order.
    pub fn conversations(&self) -> Vec<Vec<Message>> {
        self.seen.lock().clone()
    }

    /// Number of scripted steps not yet played.
    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }

    fn push(self, step: Step) -> Self {
        self.steps.lock().push_back(step);
        self
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    async fn invoke(
        &self,
        conversation: &[Message],
        _tools: &[ToolDefinition],
    ) -> anyhow::Result<ModelResponse> {
        self.seen.lock().push(conversation.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Answer(text)) => Ok(ModelResponse::FinalAnswer(text)),
            Some(Step::Echo) => {
                let last = conversation.last().map(|m| m.content.clone()).unwrap_or_default();
                Ok(ModelResponse::FinalAnswer(last))
            }
            Some(Step::Call { name, args }) => Ok(ModelResponse::ToolCall(ToolCall::new(name, args))),
            Some(Step::Fail(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("scripted model has no steps left")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_steps_play_in_order() {
        let model = ScriptedModel::new()
            .tool_call("glob", json!({"pattern": "*"}))
            .answer("done");
        let convo = vec![Message::user("hi")];

        let first = model.invoke(&convo, &[]).await.unwrap();
        assert!(matches!(first, ModelResponse::ToolCall(ref c) if c.name == "glob"));
        let second = model.invoke(&convo, &[]).await.unwrap();
        assert_eq!(second, ModelResponse::FinalAnswer("done".into()));
        assert!(model.invoke(&convo, &[]).await.is_err());
        assert_eq!(model.conversations().len(), 3);
    }

    #[tokio::test]
    async fn test_echo_and_fail() {
        let model = ScriptedModel::new().echo().fail("provider down");
        let convo = vec![Message::user("repeat me")];

        let echoed = model.invoke(&convo, &[]).await.unwrap();
        assert_eq!(echoed, ModelResponse::FinalAnswer("repeat me".into()));
        let err = model.invoke(&convo, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "provider down");
        assert_eq!(model.remaining(), 0);
    }
}
