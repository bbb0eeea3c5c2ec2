//! Agent execution errors.

use thiserror::Error;

/// Errors that end an agent invocation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model invocation service failed.
    #[error("Agent '{agent}' model invocation failed: {source}")]
    Model {
        agent: String,
        #[source]
        source: anyhow::Error,
    },

    /// The agent kept calling tools without answering or handing off.
    #[error("Agent '{agent}' reached its iteration limit ({limit}) without answering")]
    MaxIterations { agent: String, limit: u32 },
}
