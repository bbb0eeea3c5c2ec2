//! Orchestration events.
//!
//! Every state change of a `process()` call is recorded as a
//! [`HandoffEvent`], logged, and forwarded to an optional listener.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::HandoffMode;

/// Callback receiving events as they are emitted.
pub type EventListener = Arc<dyn Fn(&HandoffEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// HandoffEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum HandoffEvent {
    /// An agent invocation began. `resumed` is set when an existing
    /// conversation continues rather than a fresh one starting.
    AgentStarted {
        agent: String,
        resumed: bool,
        timestamp: DateTime<Utc>,
    },
    HandoffRequested {
        from_agent: String,
        targets: Vec<String>,
        mode: HandoffMode,
        timestamp: DateTime<Utc>,
    },
    HandoffDenied {
        from_agent: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    BranchCompleted {
        agent: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// The receiver of a parallel handoff's merged output was chosen.
    AggregationResolved {
        aggregator: String,
        requested: Option<String>,
        fell_back: bool,
        timestamp: DateTime<Utc>,
    },
    /// A target (or aggregator) failed; the requester gets an advisory.
    TargetFailed {
        from_agent: String,
        agent: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    HandoffCompleted {
        from_agent: String,
        to_agent: String,
        mode: HandoffMode,
        timestamp: DateTime<Utc>,
    },
    BudgetExceeded {
        handoffs_used: u32,
        turns_used: u32,
        timestamp: DateTime<Utc>,
    },
}

impl HandoffEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            HandoffEvent::AgentStarted { .. } => "agent_started",
            HandoffEvent::HandoffRequested { .. } => "handoff_requested",
            HandoffEvent::HandoffDenied { .. } => "handoff_denied",
            HandoffEvent::BranchCompleted { .. } => "branch_completed",
            HandoffEvent::AggregationResolved { .. } => "aggregation_resolved",
            HandoffEvent::TargetFailed { .. } => "target_failed",
            HandoffEvent::HandoffCompleted { .. } => "handoff_completed",
            HandoffEvent::BudgetExceeded { .. } => "budget_exceeded",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match *self {
            HandoffEvent::AgentStarted { timestamp, .. }
            | HandoffEvent::HandoffRequested { timestamp, .. }
            | HandoffEvent::HandoffDenied { timestamp, .. }
            | HandoffEvent::BranchCompleted { timestamp, .. }
            | HandoffEvent::AggregationResolved { timestamp, .. }
            | HandoffEvent::TargetFailed { timestamp, .. }
            | HandoffEvent::HandoffCompleted { timestamp, .. }
            | HandoffEvent::BudgetExceeded { timestamp, .. } => timestamp,
        }
    }

    fn log(&self) {
        match self {
            HandoffEvent::AgentStarted { agent, resumed, .. } => {
                log::debug!("{} {}", if *resumed { "Resuming" } else { "Starting" }, agent)
            }
            HandoffEvent::HandoffRequested {
                from_agent,
                targets,
                mode,
                ..
            } => log::info!("{} requested {} handoff to [{}]", from_agent, mode, targets.join(", ")),
            HandoffEvent::HandoffDenied { from_agent, reason, .. } => {
                log::warn!("Handoff from {} denied: {}", from_agent, reason)
            }
            HandoffEvent::BranchCompleted {
                agent,
                success,
                duration_ms,
                ..
            } => {
                if *success {
                    log::info!("Branch {} finished in {} ms", agent, duration_ms)
                } else {
                    log::warn!("Branch {} failed after {} ms", agent, duration_ms)
                }
            }
            HandoffEvent::AggregationResolved {
                aggregator,
                fell_back,
                ..
            } => log::debug!(
                "Aggregating into {}{}",
                aggregator,
                if *fell_back { " (fallback to requester)" } else { "" }
            ),
            HandoffEvent::TargetFailed { agent, error, .. } => {
                log::warn!("Handoff target {} failed: {}", agent, error)
            }
            HandoffEvent::HandoffCompleted {
                from_agent, to_agent, ..
            } => log::info!("Control passed from {} to {}", from_agent, to_agent),
            HandoffEvent::BudgetExceeded {
                handoffs_used,
                turns_used,
                ..
            } => log::warn!(
                "Budget exceeded after {} handoff(s) and {} turn(s)",
                handoffs_used,
                turns_used
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Ordered record of the events of one `process()` call.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Vec<HandoffEvent>,
    listener: Option<EventListener>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("events", &self.events)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl EventLog {
    pub fn new(listener: Option<EventListener>) -> Self {
        Self {
            events: Vec::new(),
            listener,
        }
    }

    pub fn emit(&mut self, event: HandoffEvent) {
        event.log();
        if let Some(ref listener) = self.listener {
            listener(&event);
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[HandoffEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<HandoffEvent> {
        self.events
    }
}
