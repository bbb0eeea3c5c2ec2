//! Agency: the top-level driver.
//!
//! An [`Agency`] owns its agents, communication graph, tool registry and the
//! parent [`ToolContext`]. [`Agency::process`] runs one user request through
//! the driver state machine:
//!
//! ```text
//! Start ─► (agent answers) ─────────────────────────────► Finished
//!   │
//!   └─► Handoff ─► Transferred ─► (answer | Handoff ...)
//!          │
//!          ├─► Denied / TargetFailed ─► Resume requester ─► ...
//!          └─► BudgetExceeded / denial cap / agent failure ─► Terminated
//! ```
//!
//! Several agencies can coexist; nothing here is process-global.

pub mod config;
pub mod error;
pub mod output;


use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

pub use config::AgencyConfig;
pub use error::AgencyError;
pub use output::{ProcessOutput, ProcessStatus};

use crate::agent::{Agent, AgentTurn, PendingHandoff};
use crate::handoff::budget::HandoffBudget;
use crate::handoff::coordinator::{HandoffCoordinator, HandoffOutcome, RunState};
use crate::handoff::error::HandoffError;
use crate::handoff::events::{EventListener, HandoffEvent};
use crate::handoff::graph::CommunicationGraph;
use crate::tools::context::ToolContext;
use crate::tools::handoff_tool::HandoffTool;
use crate::tools::registry::ToolRegistry;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Agency`].
#[derive(Default)]
pub struct AgencyBuilder {
    agents: Vec<Agent>,
    edges: Vec<(String, String)>,
    entry: Option<String>,
    registry: Option<ToolRegistry>,
    config: AgencyConfig,
    listener: Option<EventListener>,
}

impl AgencyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent. The first agent added is the entry point unless
    /// [`entry`](Self::entry) says otherwise.
    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    /// Permit `from` to hand off to `to`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Permit handoffs in both directions.
    pub fn bidirectional(self, a: impl Into<String>, b: impl Into<String>) -> Self {
        let a = a.into();
        let b = b.into();
        self.edge(a.clone(), b.clone()).edge(b, a)
    }

    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Use a custom tool registry instead of the built-in tool set.
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: AgencyConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive every [`HandoffEvent`] as it is emitted.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&HandoffEvent) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn build(self) -> Result<Agency, AgencyError> {
        self.config.validate()?;
        let first = self.agents.first().ok_or(AgencyError::NoAgents)?.name.clone();

        let mut agents = HashMap::with_capacity(self.agents.len());
        for agent in self.agents {
            if agents.contains_key(&agent.name) {
                return Err(AgencyError::DuplicateAgent(agent.name));
            }
            agents.insert(agent.name.clone(), Arc::new(agent));
        }

        let graph = CommunicationGraph::build(self.edges)?;
        let mut unknown: Vec<&str> = graph
            .agents()
            .into_iter()
            .filter(|name| !agents.contains_key(*name))
            .collect();
        unknown.sort_unstable();
        if let Some(name) = unknown.first() {
            return Err(AgencyError::UnknownAgent(name.to_string()));
        }

        let entry = self.entry.unwrap_or(first);
        if !agents.contains_key(&entry) {
            return Err(AgencyError::UnknownAgent(entry));
        }

        let mut registry = self
            .registry
            .unwrap_or_else(|| ToolRegistry::with_shell_timeout(self.config.shell_timeout_ms));
        if !graph.is_empty() && !registry.has_handoff_tool() {
            registry.register(HandoffTool::new());
        }

        log::debug!(
            "Built agency with {} agent(s), {} edge(s), entry {}",
            agents.len(),
            graph.edge_count(),
            entry
        );

        let context = ToolContext::new(self.config.work_dir.clone());
        let coordinator =
            HandoffCoordinator::new(agents, graph, registry, self.config.max_agent_iterations);
        Ok(Agency {
            entry,
            coordinator,
            context,
            config: self.config,
            listener: self.listener,
        })
    }
}

// ---------------------------------------------------------------------------
// Agency
// ---------------------------------------------------------------------------

/// A set of agents wired by a communication graph, driven one request at a
/// time.
pub struct Agency {
    entry: String,
    coordinator: HandoffCoordinator,
    /// Parent context shared by every sequential invocation.
    context: ToolContext,
    config: AgencyConfig,
    listener: Option<EventListener>,
}

impl std::fmt::Debug for Agency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agency")
            .field("entry", &self.entry)
            .field("coordinator", &self.coordinator)
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}

enum DriverState {
    Start,
    /// The agent named by `pending.request.from_agent` asked for a handoff.
    Handoff(PendingHandoff),
    /// Continue the requester's conversation with `tool_output`.
    Resume {
        pending: PendingHandoff,
        tool_output: String,
    },
    Finished(String),
    Terminated {
        status: ProcessStatus,
        error: String,
    },
}

enum Invocation<'a> {
    Fresh(&'a str),
    Resume(PendingHandoff, String),
}

impl Agency {
    pub fn builder() -> AgencyBuilder {
        AgencyBuilder::new()
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn config(&self) -> &AgencyConfig {
        &self.config
    }

    /// The parent tool context.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    pub fn graph(&self) -> &CommunicationGraph {
        self.coordinator.graph()
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.coordinator.registry()
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.coordinator.agent(name).map(|a| a.as_ref())
    }

    /// Names of all agents, sorted.
    pub fn agent_names(&self) -> Vec<String> {
        self.coordinator.agent_names()
    }

    /// Run one user request to a terminal state.
    ///
    /// Never fails: budget exhaustion, the denial cap and agent failures are
    /// reported through [`ProcessOutput::status`] with all partial output.
    pub async fn process(&self, input: &str) -> ProcessOutput {
        let budget = HandoffBudget::new(self.config.max_handoffs, self.config.max_turns);
        let mut run = RunState::new(budget, self.listener.clone());
        let mut denials = 0u32;
        let mut state = DriverState::Start;

        log::info!("Processing request with entry agent {}", self.entry);
        loop {
            state = match state {
                DriverState::Start => self.invoke(&self.entry, Invocation::Fresh(input), &mut run).await,
                DriverState::Resume { pending, tool_output } => {
                    let requester = pending.request.from_agent.clone();
                    self.invoke(&requester, Invocation::Resume(pending, tool_output), &mut run)
                        .await
                }
                DriverState::Handoff(pending) => {
                    match self.coordinator.execute(pending, &self.context, &mut run).await {
                        Ok(HandoffOutcome::Transferred { turn, .. }) => {
                            denials = 0;
                            next_state(turn)
                        }
                        Ok(HandoffOutcome::Denied { pending, advisory }) => {
                            denials += 1;
                            if denials >= self.config.max_consecutive_denials {
                                DriverState::Terminated {
                                    status: ProcessStatus::DenialLimitReached,
                                    error: format!(
                                        "{} consecutive handoff(s) denied. Last: {}",
                                        denials,
                                        advisory.trim_start_matches("Error: ")
                                    ),
                                }
                            } else {
                                DriverState::Resume {
                                    pending,
                                    tool_output: advisory,
                                }
                            }
                        }
                        Ok(HandoffOutcome::TargetFailed { pending, advisory }) => DriverState::Resume {
                            pending,
                            tool_output: advisory,
                        },
                        Err(err @ HandoffError::BudgetExceeded { .. }) => DriverState::Terminated {
                            status: ProcessStatus::BudgetExceeded,
                            error: err.to_string(),
                        },
                        Err(err) => DriverState::Terminated {
                            status: ProcessStatus::AgentFailed,
                            error: err.to_string(),
                        },
                    }
                }
                DriverState::Finished(text) => return self.finish(run, text),
                DriverState::Terminated { status, error } => return self.terminate(run, status, error),
            };
        }
    }

    async fn invoke(&self, name: &str, invocation: Invocation<'_>, run: &mut RunState) -> DriverState {
        if let Err(err) = run.budget.check(0, 1) {
            run.emit(HandoffEvent::BudgetExceeded {
                handoffs_used: run.budget.handoffs_used,
                turns_used: run.budget.turns_used,
                timestamp: Utc::now(),
            });
            return DriverState::Terminated {
                status: ProcessStatus::BudgetExceeded,
                error: err.to_string(),
            };
        }
        let agent = match self.coordinator.agent(name) {
            Some(agent) => Arc::clone(agent),
            None => {
                return DriverState::Terminated {
                    status: ProcessStatus::AgentFailed,
                    error: format!("Unknown agent: {}", name),
                }
            }
        };

        let scope = self.coordinator.scope(name, &self.context);
        let result = match invocation {
            Invocation::Fresh(input) => {
                run.involve(name);
                run.begin_turn(name, false);
                agent.start(input, scope).await
            }
            Invocation::Resume(pending, tool_output) => {
                run.begin_turn(name, true);
                agent.resume(pending, &tool_output, scope).await
            }
        };

        match result {
            Ok(turn) => {
                if let AgentTurn::Final(ref text) = turn {
                    run.record_output(name, text);
                }
                next_state(turn)
            }
            Err(err) => DriverState::Terminated {
                status: ProcessStatus::AgentFailed,
                error: err.to_string(),
            },
        }
    }

    fn finish(&self, run: RunState, text: String) -> ProcessOutput {
        log::info!(
            "Request completed by {} agent invocation(s), {} handoff(s)",
            run.budget.turns_used,
            run.budget.handoffs_used
        );
        ProcessOutput {
            final_text: text,
            agents_involved: run.agents_involved,
            handoffs_used: run.budget.handoffs_used,
            turns_used: run.budget.turns_used,
            status: ProcessStatus::Completed,
            error: None,
            branch_results: run.branch_results,
            events: run.events.into_events(),
        }
    }

    fn terminate(&self, run: RunState, status: ProcessStatus, error: String) -> ProcessOutput {
        log::warn!("Request terminated ({}): {}", status, error);
        ProcessOutput {
            final_text: output::partial_text(&run.outputs, status, &error),
            agents_involved: run.agents_involved,
            handoffs_used: run.budget.handoffs_used,
            turns_used: run.budget.turns_used,
            status,
            error: Some(error),
            branch_results: run.branch_results,
            events: run.events.into_events(),
        }
    }
}

fn next_state(turn: AgentTurn) -> DriverState {
    match turn {
        AgentTurn::Final(text) => DriverState::Finished(text),
        AgentTurn::Handoff(pending) => DriverState::Handoff(pending),
    }
}
