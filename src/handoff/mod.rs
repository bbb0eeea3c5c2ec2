//! Handoff orchestration.
//!
//! The communication graph declares who may hand off to whom; the
//! coordinator validates a [`HandoffRequest`] against it and the per-request
//! budget, dispatches sequential or parallel work, and hands back a single
//! continuation.

pub mod branch;
pub mod budget;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod graph;
pub mod request;

pub use branch::{merge_results, BranchResult};
pub use budget::HandoffBudget;
pub use coordinator::{HandoffCoordinator, HandoffOutcome, RunState};
pub use error::{GraphError, HandoffError};
pub use events::{EventListener, EventLog, HandoffEvent};
pub use graph::CommunicationGraph;
pub use request::{HandoffArgs, HandoffMode, HandoffRequest};
