//! Per-request work budget.

use serde::{Deserialize, Serialize};

use super::error::HandoffError;

/// Counters bounding the work of one `process()` call.
///
/// A fresh budget is created for every top-level request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffBudget {
    pub handoffs_used: u32,
    pub max_handoffs: u32,
    pub turns_used: u32,
    pub max_turns: u32,
}

impl HandoffBudget {
    pub fn new(max_handoffs: u32, max_turns: u32) -> Self {
        Self {
            handoffs_used: 0,
            max_handoffs,
            turns_used: 0,
            max_turns,
        }
    }

    /// Check that `handoffs` more handoffs and `turns` more agent invocations
    /// fit without overrunning either limit. Nothing is recorded.
    pub fn check(&self, handoffs: u32, turns: u32) -> Result<(), HandoffError> {
        let handoffs_ok = self.handoffs_used.saturating_add(handoffs) <= self.max_handoffs;
        let turns_ok = self.turns_used.saturating_add(turns) <= self.max_turns;
        if handoffs_ok && turns_ok {
            Ok(())
        } else {
            Err(HandoffError::BudgetExceeded {
                handoffs_used: self.handoffs_used,
                max_handoffs: self.max_handoffs,
                turns_used: self.turns_used,
                max_turns: self.max_turns,
                needed_handoffs: handoffs,
                needed_turns: turns,
            })
        }
    }

    pub fn record_handoffs(&mut self, count: u32) {
        self.handoffs_used = self.handoffs_used.saturating_add(count);
    }

    pub fn record_turn(&mut self) {
        self.turns_used = self.turns_used.saturating_add(1);
    }

    pub fn handoffs_remaining(&self) -> u32 {
        self.max_handoffs.saturating_sub(self.handoffs_used)
    }

    pub fn turns_remaining(&self) -> u32 {
        self.max_turns.saturating_sub(self.turns_used)
    }
}
