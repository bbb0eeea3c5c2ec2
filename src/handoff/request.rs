//! Handoff request DTOs.
//!
//! A [`HandoffRequest`] is what an agent produces when it asks to transfer
//! control. It is built from the handoff pseudo-tool's arguments, never
//! constructed by the coordinator itself.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How the targets of a handoff are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffMode {
    /// Exactly one target, invoked synchronously on the shared context.
    #[default]
    Sequential,
    /// Two or more targets, run concurrently on forked contexts, then aggregated.
    Parallel,
}

impl fmt::Display for HandoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffMode::Sequential => write!(f, "sequential"),
            HandoffMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Raw argument shape of the handoff pseudo-tool. Keys match the tool's
/// argument schema exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffArgs {
    pub targets: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<HandoffMode>,
    #[serde(default, rename = "aggregationTarget", skip_serializing_if = "Option::is_none")]
    pub aggregation_target: Option<String>,
}

/// A validated request from one agent to transfer control.
///
/// Invariants upheld by [`HandoffRequest::from_args`]:
/// `targets` is non-empty, duplicate-free and in request order, and
/// `mode == Parallel` exactly when `targets.len() > 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    /// Requesting agent.
    pub from_agent: String,
    /// Ordered, duplicate-free target agent names.
    pub targets: Vec<String>,
    /// Message handed to every target.
    pub message: String,
    pub mode: HandoffMode,
    /// Preferred receiver of the merged parallel output.
    pub aggregation_target: Option<String>,
}

impl HandoffRequest {
    /// Sequential request to a single target.
    pub fn sequential(
        from_agent: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            from_agent: from_agent.into(),
            targets: vec![target.into()],
            message: message.into(),
            mode: HandoffMode::Sequential,
            aggregation_target: None,
        }
    }

    /// Parallel fan-out request. Targets are de-duplicated in order.
    pub fn parallel<I, S>(from_agent: impl Into<String>, targets: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from_agent: from_agent.into(),
            targets: dedup(targets.into_iter().map(Into::into)),
            message: message.into(),
            mode: HandoffMode::Parallel,
            aggregation_target: None,
        }
    }

    /// Builder: set the aggregation target.
    pub fn aggregate_to(mut self, agent: impl Into<String>) -> Self {
        self.aggregation_target = Some(agent.into());
        self
    }

    /// Build a request from tool arguments issued by `from_agent`.
    ///
    /// When `mode` is omitted it is inferred from the target count.
    pub fn from_args(from_agent: &str, args: HandoffArgs) -> Result<Self, String> {
        let targets = dedup(
            args.targets
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        );
        if targets.is_empty() {
            return Err("at least one target agent is required".to_string());
        }
        if args.message.trim().is_empty() {
            return Err("message must not be empty".to_string());
        }

        let mode = match (args.mode, targets.len()) {
            (None, 1) => HandoffMode::Sequential,
            (None, _) => HandoffMode::Parallel,
            (Some(HandoffMode::Sequential), 1) => HandoffMode::Sequential,
            (Some(HandoffMode::Sequential), n) => {
                return Err(format!(
                    "sequential mode takes exactly one target, got {}",
                    n
                ))
            }
            (Some(HandoffMode::Parallel), 1) => {
                return Err("parallel mode requires at least two distinct targets".to_string())
            }
            (Some(HandoffMode::Parallel), _) => HandoffMode::Parallel,
        };

        Ok(Self {
            from_agent: from_agent.to_string(),
            targets,
            message: args.message,
            mode,
            aggregation_target: args
                .aggregation_target
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        })
    }

    /// Short description used in logs and transcripts.
    pub fn summary(&self) -> String {
        format!(
            "{} -> [{}] ({})",
            self.from_agent,
            self.targets.join(", "),
            self.mode
        )
    }
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|t| seen.insert(t.clone())).collect()
}
