//! Agent module.
//!
//! This module contains the [`Agent`] struct and its inner loop, the
//! conversation types exchanged with the model, and the abstract
//! [`ModelInvoker`] collaborator together with a scripted implementation.

pub mod core;
pub mod error;
pub mod message;
pub mod model;
pub mod scripted;

// Re-export the main Agent type.
pub use self::core::{Agent, AgentScope, AgentTurn, PendingHandoff, DEFAULT_MAX_ITERATIONS};
pub use error::AgentError;
pub use message::{Message, Role};
pub use model::{ModelInvoker, ModelResponse};
pub use scripted::ScriptedModel;
