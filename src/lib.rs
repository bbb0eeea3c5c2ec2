//! # Agency
//!
//! Handoff orchestration for teams of tool-using conversational agents.
//!
//! An [`Agency`] owns a set of [`Agent`]s, a [`CommunicationGraph`] declaring
//! which agent may hand control to which, and a [`ToolRegistry`]. Each
//! request runs until an agent answers, with sequential handoffs passing
//! control along the graph and parallel handoffs fanning out to isolated
//! branches whose results are merged for an aggregation target.

pub mod agency;
pub mod agent;
pub mod handoff;
pub mod tools;

pub use agency::{Agency, AgencyBuilder, AgencyConfig, AgencyError, ProcessOutput, ProcessStatus};
pub use agent::{Agent, AgentError, Message, ModelInvoker, ModelResponse, ScriptedModel};
pub use handoff::{
    BranchResult, CommunicationGraph, HandoffCoordinator, HandoffError, HandoffEvent, HandoffMode,
    HandoffRequest,
};
pub use tools::{Tool, ToolCall, ToolContext, ToolError, ToolRegistry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
