//! Handoff errors.

use thiserror::Error;

use crate::agent::error::AgentError;

/// Invalid communication graph declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Agent '{0}' cannot hand off to itself")]
    SelfEdge(String),
}

/// Errors raised while coordinating a handoff.
///
/// `Denied` is recoverable and turned into advisory text for the requester.
/// The other variants end the current `process()` call.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Policy violation: unknown target or missing edge.
    #[error("Handoff denied: {reason}")]
    Denied { reason: String },

    /// Accepting the request would overrun the handoff or turn budget.
    #[error(
        "Handoff budget exceeded: {handoffs_used}/{max_handoffs} handoffs and \
         {turns_used}/{max_turns} turns used, request needs {needed_handoffs} more \
         handoff(s) and {needed_turns} more turn(s)"
    )]
    BudgetExceeded {
        handoffs_used: u32,
        max_handoffs: u32,
        turns_used: u32,
        max_turns: u32,
        needed_handoffs: u32,
        needed_turns: u32,
    },

    /// The agent that owns the continuation failed while resuming.
    #[error(transparent)]
    AgentFailed(#[from] AgentError),
}

impl HandoffError {
    pub fn denied(reason: impl Into<String>) -> Self {
        HandoffError::Denied {
            reason: reason.into(),
        }
    }

    /// Whether the error ends the current `process()` call.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HandoffError::Denied { .. })
    }
}
