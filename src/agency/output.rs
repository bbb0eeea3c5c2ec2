//! Result of one `Agency::process` call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::handoff::branch::BranchResult;
use crate::handoff::events::HandoffEvent;

/// How a `process()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// The current agent produced a plain answer.
    Completed,
    BudgetExceeded,
    /// Too many handoffs in a row were denied.
    DenialLimitReached,
    /// The current agent itself failed.
    AgentFailed,
}

impl ProcessStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessStatus::Completed)
    }

    /// Marker line appended to partial output.
    pub fn marker(&self) -> &'static str {
        match self {
            ProcessStatus::Completed => "",
            ProcessStatus::BudgetExceeded => "[BUDGET EXCEEDED]",
            ProcessStatus::DenialLimitReached => "[HANDOFF DENIAL LIMIT REACHED]",
            ProcessStatus::AgentFailed => "[AGENT FAILED]",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Completed => "completed",
            ProcessStatus::BudgetExceeded => "budget_exceeded",
            ProcessStatus::DenialLimitReached => "denial_limit_reached",
            ProcessStatus::AgentFailed => "agent_failed",
        };
        write!(f, "{}", s)
    }
}

/// Everything a caller gets back from `process()`, including on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Final answer, or the partial outputs followed by a status marker.
    pub final_text: String,
    /// Agents in invocation order.
    pub agents_involved: Vec<String>,
    pub handoffs_used: u32,
    pub turns_used: u32,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Results of every parallel branch, in completion order.
    #[serde(default)]
    pub branch_results: Vec<BranchResult>,
    #[serde(default)]
    pub events: Vec<HandoffEvent>,
}

impl ProcessOutput {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ProcessOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.final_text)
    }
}

/// Join partial outputs and terminate them with the status marker.
pub(crate) fn partial_text(outputs: &[(String, String)], status: ProcessStatus, error: &str) -> String {
    let mut text = outputs
        .iter()
        .map(|(agent, output)| format!("{}: {}", agent, output))
        .collect::<Vec<_>>()
        .join("\n\n");
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(&format!("{} {}", status.marker(), error));
    text
}
