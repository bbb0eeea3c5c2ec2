//! Agency construction and configuration errors.

use thiserror::Error;

use crate::handoff::error::GraphError;

/// Errors raised while configuring or building an [`Agency`](super::Agency).
#[derive(Debug, Error)]
pub enum AgencyError {
    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is out of range or unparsable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An edge or the entry point names an agent that was never added.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),

    #[error("An agency needs at least one agent")]
    NoAgents,
}
