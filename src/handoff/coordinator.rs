//! Handoff coordinator.
//!
//! Executes one [`HandoffRequest`] to completion as an explicit state
//! machine:
//!
//! ```text
//! Validate ──► Dispatch ──► (Aggregate, parallel only) ──► Done
//!    │
//!    └──► Done(Denied)      BudgetExceeded is returned as an error
//! ```
//!
//! Sequential handoffs run the single target on the caller's context.
//! Parallel handoffs fork the context once per target, run every branch as
//! its own task, and feed the merged results to the aggregation target.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};

use super::branch::{merge_results, BranchResult};
use super::budget::HandoffBudget;
use super::error::HandoffError;
use super::events::{EventLog, EventListener, HandoffEvent};
use super::graph::CommunicationGraph;
use super::request::{HandoffMode, HandoffRequest};
use crate::agent::{Agent, AgentScope, AgentTurn, PendingHandoff};
use crate::tools::context::ToolContext;
use crate::tools::error::ToolError;
use crate::tools::registry::ToolRegistry;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Mutable bookkeeping for one top-level `process()` call.
#[derive(Debug)]
pub struct RunState {
    pub budget: HandoffBudget,
    /// Agents in invocation order. Branches appear in completion order.
    pub agents_involved: Vec<String>,
    /// Every branch result produced so far, across all parallel handoffs.
    pub branch_results: Vec<BranchResult>,
    /// Text produced so far, as `(agent, text)` pairs.
    pub outputs: Vec<(String, String)>,
    pub events: EventLog,
}

impl RunState {
    pub fn new(budget: HandoffBudget, listener: Option<EventListener>) -> Self {
        Self {
            budget,
            agents_involved: Vec::new(),
            branch_results: Vec::new(),
            outputs: Vec::new(),
            events: EventLog::new(listener),
        }
    }

    /// Add `agent` to the involvement list.
    pub fn involve(&mut self, agent: &str) {
        self.agents_involved.push(agent.to_string());
    }

    /// Account for one agent invocation.
    pub fn begin_turn(&mut self, agent: &str, resumed: bool) {
        self.budget.record_turn();
        self.events.emit(HandoffEvent::AgentStarted {
            agent: agent.to_string(),
            resumed,
            timestamp: Utc::now(),
        });
    }

    pub fn record_output(&mut self, agent: &str, text: &str) {
        self.outputs.push((agent.to_string(), text.to_string()));
    }

    pub fn emit(&mut self, event: HandoffEvent) {
        self.events.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a coordinated handoff ended.
#[derive(Debug)]
pub enum HandoffOutcome {
    /// The request was refused. The requester resumes with `advisory` as the
    /// handoff call's result.
    Denied {
        pending: PendingHandoff,
        advisory: String,
    },
    /// A dispatched target, or the aggregation target, failed. The requester
    /// resumes with `advisory`.
    TargetFailed {
        pending: PendingHandoff,
        advisory: String,
    },
    /// Control moved to `agent`, whose invocation ended with `turn`.
    Transferred { agent: String, turn: AgentTurn },
}

enum Phase {
    Validate(PendingHandoff),
    Dispatch(PendingHandoff),
    Aggregate {
        pending: PendingHandoff,
        results: Vec<BranchResult>,
    },
    Done(HandoffOutcome),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Validate(_) => "validate",
            Phase::Dispatch(_) => "dispatch",
            Phase::Aggregate { .. } => "aggregate",
            Phase::Done(_) => "done",
        }
    }
}

// ---------------------------------------------------------------------------
// HandoffCoordinator
// ---------------------------------------------------------------------------

/// Validates and executes handoff requests for one agency.
#[derive(Debug, Clone)]
pub struct HandoffCoordinator {
    agents: Arc<HashMap<String, Arc<Agent>>>,
    graph: Arc<CommunicationGraph>,
    registry: Arc<ToolRegistry>,
    max_agent_iterations: u32,
}

impl HandoffCoordinator {
    pub fn new(
        agents: HashMap<String, Arc<Agent>>,
        graph: CommunicationGraph,
        registry: ToolRegistry,
        max_agent_iterations: u32,
    ) -> Self {
        Self {
            agents: Arc::new(agents),
            graph: Arc::new(graph),
            registry: Arc::new(registry),
            max_agent_iterations,
        }
    }

    pub fn agent(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents.get(name)
    }

    /// Names of all agents, sorted.
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn graph(&self) -> &CommunicationGraph {
        &self.graph
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invocation scope for `agent` running against `context`.
    pub fn scope<'a>(&'a self, agent: &str, context: &'a ToolContext) -> AgentScope<'a> {
        AgentScope {
            registry: &self.registry,
            context,
            peers: self.graph.allowed_targets(agent),
            max_iterations: self.max_agent_iterations,
        }
    }

    /// Drive `pending.request` through validate, dispatch and aggregate.
    ///
    /// Only budget exhaustion and a failed resume of the requester are
    /// errors; every other failure is folded into the outcome.
    pub async fn execute(
        &self,
        pending: PendingHandoff,
        context: &ToolContext,
        run: &mut RunState,
    ) -> Result<HandoffOutcome, HandoffError> {
        run.emit(HandoffEvent::HandoffRequested {
            from_agent: pending.request.from_agent.clone(),
            targets: pending.request.targets.clone(),
            mode: pending.request.mode,
            timestamp: Utc::now(),
        });

        let mut phase = Phase::Validate(pending);
        loop {
            log::debug!("Handoff phase: {}", phase.name());
            phase = match phase {
                Phase::Validate(pending) => self.validate(pending, run)?,
                Phase::Dispatch(pending) => match pending.request.mode {
                    HandoffMode::Sequential => self.dispatch_sequential(pending, context, run).await,
                    HandoffMode::Parallel => self.dispatch_parallel(pending, context, run).await,
                },
                Phase::Aggregate { pending, results } => {
                    self.aggregate(pending, results, context, run).await?
                }
                Phase::Done(outcome) => return Ok(outcome),
            };
        }
    }

    // -- Validate ----------------------------------------------------------

    fn validate(&self, pending: PendingHandoff, run: &mut RunState) -> Result<Phase, HandoffError> {
        let request = &pending.request;
        let width = request.targets.len() as u32;
        let turns = match request.mode {
            HandoffMode::Sequential => 1,
            HandoffMode::Parallel => width + 1,
        };
        if let Err(err) = run.budget.check(width, turns) {
            run.emit(HandoffEvent::BudgetExceeded {
                handoffs_used: run.budget.handoffs_used,
                turns_used: run.budget.turns_used,
                timestamp: Utc::now(),
            });
            return Err(err);
        }

        match self.check_request(request) {
            Ok(()) => Ok(Phase::Dispatch(pending)),
            Err(err) => {
                run.emit(HandoffEvent::HandoffDenied {
                    from_agent: request.from_agent.clone(),
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                let advisory = format!("Error: {}", err);
                Ok(Phase::Done(HandoffOutcome::Denied { pending, advisory }))
            }
        }
    }

    fn check_request(&self, request: &HandoffRequest) -> Result<(), HandoffError> {
        if request.targets.is_empty() {
            return Err(HandoffError::denied("no target agents given"));
        }
        match (request.mode, request.targets.len()) {
            (HandoffMode::Sequential, 1) => {}
            (HandoffMode::Parallel, n) if n > 1 => {}
            (mode, n) => {
                return Err(HandoffError::denied(format!(
                    "{} mode cannot take {} target(s)",
                    mode, n
                )))
            }
        }

        let from = request.from_agent.as_str();
        let allowed = self.graph.allowed_targets(from);
        for target in &request.targets {
            if !self.agents.contains_key(target) {
                return Err(HandoffError::denied(format!(
                    "unknown agent '{}'. Allowed targets for {}: {}",
                    target,
                    from,
                    describe(allowed)
                )));
            }
            if !self.graph.can_handoff(from, target) {
                return Err(HandoffError::denied(format!(
                    "{} cannot hand off to {}. Allowed targets: {}",
                    from,
                    target,
                    describe(allowed)
                )));
            }
        }
        Ok(())
    }

    // -- Dispatch ----------------------------------------------------------

    async fn dispatch_sequential(
        &self,
        pending: PendingHandoff,
        context: &ToolContext,
        run: &mut RunState,
    ) -> Phase {
        let target = pending.request.targets[0].clone();
        let from = pending.request.from_agent.clone();
        let agent = match self.agents.get(&target) {
            Some(agent) => Arc::clone(agent),
            None => return Phase::Done(missing_agent(pending, &target)),
        };

        run.budget.record_handoffs(1);
        run.involve(&target);
        run.begin_turn(&target, false);
        let input = handoff_input(&from, &pending.request.message);
        match agent.start(&input, self.scope(&target, context)).await {
            Ok(turn) => {
                if let AgentTurn::Final(ref text) = turn {
                    run.record_output(&target, text);
                }
                run.emit(HandoffEvent::HandoffCompleted {
                    from_agent: from,
                    to_agent: target.clone(),
                    mode: HandoffMode::Sequential,
                    timestamp: Utc::now(),
                });
                Phase::Done(HandoffOutcome::Transferred { agent: target, turn })
            }
            Err(err) => Phase::Done(target_failed(pending, &target, err.to_string(), run)),
        }
    }

    async fn dispatch_parallel(
        &self,
        pending: PendingHandoff,
        context: &ToolContext,
        run: &mut RunState,
    ) -> Phase {
        let targets = pending.request.targets.clone();
        let mut agents = Vec::with_capacity(targets.len());
        for target in &targets {
            match self.agents.get(target) {
                Some(agent) => agents.push((target.clone(), Arc::clone(agent))),
                None => return Phase::Done(missing_agent(pending, target)),
            }
        }
        let width = agents.len();
        run.budget.record_handoffs(width as u32);

        let started = Instant::now();
        let mut running = FuturesUnordered::new();
        for (target, agent) in agents {
            run.begin_turn(&target, false);

            let registry = Arc::clone(&self.registry);
            let peers = self.graph.allowed_targets(&target).to_vec();
            let branch_context = context.fork();
            let max_iterations = self.max_agent_iterations;
            let input = branch_input(&pending.request.from_agent, &pending.request.message, width);

            let handle = tokio::spawn(async move {
                let branch_started = Instant::now();
                let scope = AgentScope {
                    registry: &registry,
                    context: &branch_context,
                    peers: &peers,
                    max_iterations,
                };
                let result = agent.start(&input, scope).await;
                (result, branch_started.elapsed().as_millis() as u64)
            });
            running.push(async move { (target, handle.await) });
        }

        let mut results = Vec::with_capacity(width);
        while let Some((name, joined)) = running.next().await {
            let result = match joined {
                Ok((Ok(AgentTurn::Final(text)), ms)) => BranchResult::succeeded(&name, text, ms),
                Ok((Ok(AgentTurn::Handoff(_)), ms)) => {
                    BranchResult::failed(&name, ToolError::NestedHandoffRejected.to_string(), ms)
                }
                Ok((Err(err), ms)) => BranchResult::failed(&name, err.to_string(), ms),
                Err(join_err) => BranchResult::failed(
                    &name,
                    format!("branch task aborted: {}", join_err),
                    started.elapsed().as_millis() as u64,
                ),
            };

            run.involve(&name);
            if result.success {
                run.record_output(&name, &result.output);
            }
            run.emit(HandoffEvent::BranchCompleted {
                agent: name,
                success: result.success,
                duration_ms: result.duration_ms,
                timestamp: Utc::now(),
            });
            results.push(result);
        }

        run.branch_results.extend(results.iter().cloned());
        Phase::Aggregate { pending, results }
    }

    // -- Aggregate ---------------------------------------------------------

    /// Resolve who receives the merged output of a parallel handoff.
    ///
    /// The requested aggregation target is used only if it exists and can be
    /// reached from every branch target; otherwise the requester aggregates.
    pub fn resolve_aggregator(&self, request: &HandoffRequest) -> (String, bool) {
        match request.aggregation_target {
            Some(ref wanted)
                if self.agents.contains_key(wanted)
                    && request.targets.iter().all(|t| self.graph.is_reachable(t, wanted)) =>
            {
                (wanted.clone(), false)
            }
            Some(_) => (request.from_agent.clone(), true),
            None => (request.from_agent.clone(), false),
        }
    }

    async fn aggregate(
        &self,
        pending: PendingHandoff,
        results: Vec<BranchResult>,
        context: &ToolContext,
        run: &mut RunState,
    ) -> Result<Phase, HandoffError> {
        let (aggregator, fell_back) = self.resolve_aggregator(&pending.request);
        run.emit(HandoffEvent::AggregationResolved {
            aggregator: aggregator.clone(),
            requested: pending.request.aggregation_target.clone(),
            fell_back,
            timestamp: Utc::now(),
        });

        let from = pending.request.from_agent.clone();
        let summary = merge_results(&from, &pending.request.message, &results);
        let agent = match self.agents.get(&aggregator) {
            Some(agent) => Arc::clone(agent),
            None => return Ok(Phase::Done(missing_agent(pending, &aggregator))),
        };

        let resumes = aggregator == from;
        run.involve(&aggregator);
        run.begin_turn(&aggregator, resumes);
        let turn = if resumes {
            // The requester picks up its own conversation, summary as the
            // handoff call's result.
            agent.resume(pending, &summary, self.scope(&aggregator, context)).await?
        } else {
            match agent.start(&summary, self.scope(&aggregator, context)).await {
                Ok(turn) => turn,
                Err(err) => {
                    return Ok(Phase::Done(target_failed(pending, &aggregator, err.to_string(), run)))
                }
            }
        };

        if let AgentTurn::Final(ref text) = turn {
            run.record_output(&aggregator, text);
        }
        run.emit(HandoffEvent::HandoffCompleted {
            from_agent: from,
            to_agent: aggregator.clone(),
            mode: HandoffMode::Parallel,
            timestamp: Utc::now(),
        });
        Ok(Phase::Done(HandoffOutcome::Transferred {
            agent: aggregator,
            turn,
        }))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn describe(targets: &[String]) -> String {
    if targets.is_empty() {
        "none".to_string()
    } else {
        targets.join(", ")
    }
}

fn handoff_input(from: &str, message: &str) -> String {
    format!("[Handoff from {}]\n{}", from, message)
}

fn branch_input(from: &str, message: &str, width: usize) -> String {
    format!(
        "[Parallel handoff from {}, one of {} concurrent branches. Answer directly; \
         your result is merged with the others.]\n{}",
        from, width, message
    )
}

fn missing_agent(pending: PendingHandoff, name: &str) -> HandoffOutcome {
    let advisory = format!("Error: {}", HandoffError::denied(format!("unknown agent '{}'", name)));
    HandoffOutcome::Denied { pending, advisory }
}

fn target_failed(pending: PendingHandoff, agent: &str, error: String, run: &mut RunState) -> HandoffOutcome {
    let advisory = format!("Error: Handoff to {} failed: {}", agent, error);
    run.emit(HandoffEvent::TargetFailed {
        from_agent: pending.request.from_agent.clone(),
        agent: agent.to_string(),
        error,
        timestamp: Utc::now(),
    });
    HandoffOutcome::TargetFailed { pending, advisory }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Message, ScriptedModel};
    use std::collections::HashSet;
    use std::time::Duration;

    fn pending(request: HandoffRequest) -> PendingHandoff {
        PendingHandoff {
            request,
            conversation: vec![Message::system("You are Coder."), Message::user("go")],
            call_id: "call_1".to_string(),
        }
    }

    fn coordinator(
        agents: Vec<(&str, ScriptedModel)>,
        edges: &[(&str, &str)],
    ) -> (HandoffCoordinator, HashMap<String, Arc<ScriptedModel>>) {
        let mut map = HashMap::new();
        let mut models = HashMap::new();
        for (name, model) in agents {
            let model = Arc::new(model);
            models.insert(name.to_string(), Arc::clone(&model));
            map.insert(name.to_string(), Arc::new(Agent::new(name, format!("{} agent", name), model)));
        }
        let graph = CommunicationGraph::build(edges.iter().copied()).unwrap();
        (
            HandoffCoordinator::new(map, graph, ToolRegistry::with_default_tools(), 5),
            models,
        )
    }

    fn run_state(max_handoffs: u32) -> RunState {
        RunState::new(HandoffBudget::new(max_handoffs, 25), None)
    }

    #[tokio::test]
    async fn test_sequential_transfers_control() {
        let (coord, models) = coordinator(
            vec![("Coder", ScriptedModel::new()), ("Planner", ScriptedModel::new().answer("plan ready"))],
            &[("Coder", "Planner")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);

        let outcome = coord
            .execute(pending(HandoffRequest::sequential("Coder", "Planner", "make a plan")), &ctx, &mut run)
            .await
            .unwrap();

        match outcome {
            HandoffOutcome::Transferred { agent, turn } => {
                assert_eq!(agent, "Planner");
                assert!(matches!(turn, AgentTurn::Final(ref t) if t == "plan ready"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(run.budget.handoffs_used, 1);
        assert_eq!(run.budget.turns_used, 1);
        assert_eq!(run.agents_involved, vec!["Planner"]);
        let seen = models["Planner"].conversations();
        assert!(seen[0][1].content.contains("[Handoff from Coder]\nmake a plan"));
    }

    #[tokio::test]
    async fn test_missing_edge_is_denied_without_invocation() {
        let (coord, models) = coordinator(
            vec![
                ("Coder", ScriptedModel::new()),
                ("Planner", ScriptedModel::new()),
                ("Critic", ScriptedModel::new().answer("never")),
            ],
            &[("Coder", "Planner")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);

        let outcome = coord
            .execute(pending(HandoffRequest::sequential("Coder", "Critic", "review")), &ctx, &mut run)
            .await
            .unwrap();

        match outcome {
            HandoffOutcome::Denied { advisory, pending } => {
                assert_eq!(
                    advisory,
                    "Error: Handoff denied: Coder cannot hand off to Critic. Allowed targets: Planner"
                );
                assert_eq!(pending.call_id, "call_1");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(models["Critic"].conversations().is_empty());
        assert_eq!(run.budget.handoffs_used, 0);
        assert_eq!(run.budget.turns_used, 0);
    }

    #[tokio::test]
    async fn test_budget_checked_before_graph() {
        let (coord, _) = coordinator(
            vec![("Coder", ScriptedModel::new()), ("Planner", ScriptedModel::new())],
            &[("Coder", "Planner")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(0);

        let err = coord
            .execute(pending(HandoffRequest::sequential("Coder", "Nobody", "x")), &ctx, &mut run)
            .await
            .unwrap_err();
        assert!(matches!(err, HandoffError::BudgetExceeded { max_handoffs: 0, .. }));
        assert_eq!(run.events.events().last().unwrap().event_type(), "budget_exceeded");
    }

    #[tokio::test]
    async fn test_parallel_returns_one_result_per_target() {
        let (coord, _) = coordinator(
            vec![
                ("Coder", ScriptedModel::new().echo()),
                ("Planner", ScriptedModel::new().with_delay(Duration::from_millis(40)).answer("plan")),
                ("Critic", ScriptedModel::new().answer("critique")),
                ("Tester", ScriptedModel::new().with_delay(Duration::from_millis(10)).answer("tests")),
            ],
            &[("Coder", "Planner"), ("Coder", "Critic"), ("Coder", "Tester")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);
        let request = HandoffRequest::parallel("Coder", ["Planner", "Critic", "Tester"], "review");

        let outcome = coord.execute(pending(request), &ctx, &mut run).await.unwrap();

        assert_eq!(run.branch_results.len(), 3);
        let names: HashSet<&str> = run.branch_results.iter().map(|r| r.agent_name.as_str()).collect();
        assert_eq!(names, HashSet::from(["Planner", "Critic", "Tester"]));
        assert!(run.branch_results.iter().all(|r| r.success));
        // Completion order: the slowest branch lands last.
        assert_eq!(run.branch_results[2].agent_name, "Planner");

        assert_eq!(run.budget.handoffs_used, 3);
        assert_eq!(run.budget.turns_used, 4);
        assert_eq!(run.agents_involved.len(), 4);
        assert_eq!(run.agents_involved[3], "Coder");

        match outcome {
            HandoffOutcome::Transferred { agent, turn: AgentTurn::Final(summary) } => {
                assert_eq!(agent, "Coder");
                assert!(summary.contains("3/3 branch(es) succeeded"));
                assert!(summary.contains("## Planner (success"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_branch_failure_is_isolated() {
        let (coord, _) = coordinator(
            vec![
                ("Coder", ScriptedModel::new().echo()),
                ("Planner", ScriptedModel::new().fail("provider down")),
                ("Critic", ScriptedModel::new().answer("critique")),
            ],
            &[("Coder", "Planner"), ("Coder", "Critic")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);

        coord
            .execute(pending(HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x")), &ctx, &mut run)
            .await
            .unwrap();

        let planner = run.branch_results.iter().find(|r| r.agent_name == "Planner").unwrap();
        assert!(!planner.success);
        assert!(planner.error.as_deref().unwrap().contains("provider down"));
        let critic = run.branch_results.iter().find(|r| r.agent_name == "Critic").unwrap();
        assert!(critic.success);
        assert_eq!(critic.output, "critique");
    }

    #[tokio::test]
    async fn test_aggregator_resolution() {
        let (coord, _) = coordinator(
            vec![
                ("Coder", ScriptedModel::new()),
                ("Planner", ScriptedModel::new()),
                ("Critic", ScriptedModel::new()),
                ("Lead", ScriptedModel::new()),
            ],
            &[
                ("Coder", "Planner"),
                ("Coder", "Critic"),
                ("Planner", "Critic"),
                ("Critic", "Lead"),
            ],
        );

        let reachable = HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x").aggregate_to("Lead");
        assert_eq!(coord.resolve_aggregator(&reachable), ("Lead".to_string(), false));

        // Coder is not reachable from either branch.
        let unreachable = HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x").aggregate_to("Coder");
        assert_eq!(coord.resolve_aggregator(&unreachable), ("Coder".to_string(), true));

        let unknown = HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x").aggregate_to("Ghost");
        assert_eq!(coord.resolve_aggregator(&unknown), ("Coder".to_string(), true));

        let absent = HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x");
        assert_eq!(coord.resolve_aggregator(&absent), ("Coder".to_string(), false));
    }

    #[tokio::test]
    async fn test_other_aggregator_starts_fresh_with_summary() {
        let (coord, models) = coordinator(
            vec![
                ("Coder", ScriptedModel::new()),
                ("Planner", ScriptedModel::new().answer("plan")),
                ("Critic", ScriptedModel::new().answer("critique")),
                ("Lead", ScriptedModel::new().answer("merged")),
            ],
            &[("Coder", "Planner"), ("Coder", "Critic"), ("Planner", "Lead"), ("Critic", "Lead")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);
        let request = HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x").aggregate_to("Lead");

        let outcome = coord.execute(pending(request), &ctx, &mut run).await.unwrap();

        assert!(matches!(outcome, HandoffOutcome::Transferred { ref agent, .. } if agent == "Lead"));
        assert_eq!(run.agents_involved.last().map(String::as_str), Some("Lead"));
        assert!(models["Coder"].conversations().is_empty());
        let lead_input = &models["Lead"].conversations()[0][1].content;
        assert!(lead_input.starts_with("Parallel handoff from Coder completed: 2/2"));
    }

    #[tokio::test]
    async fn test_failed_sequential_target_reports_back() {
        let (coord, _) = coordinator(
            vec![("Coder", ScriptedModel::new()), ("Planner", ScriptedModel::new().fail("boom"))],
            &[("Coder", "Planner")],
        );
        let ctx = ToolContext::default();
        let mut run = run_state(10);

        let outcome = coord
            .execute(pending(HandoffRequest::sequential("Coder", "Planner", "x")), &ctx, &mut run)
            .await
            .unwrap();
        match outcome {
            HandoffOutcome::TargetFailed { advisory, .. } => {
                assert!(advisory.starts_with("Error: Handoff to Planner failed: "));
                assert!(advisory.contains("boom"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(run.budget.handoffs_used, 1);
    }

    #[tokio::test]
    async fn test_branches_run_on_forked_contexts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "seed\n").unwrap();
        let (coord, _) = coordinator(
            vec![
                ("Coder", ScriptedModel::new().echo()),
                (
                    "Planner",
                    ScriptedModel::new()
                        .tool_call("read_file", serde_json::json!({"path": "notes.md"}))
                        .answer("read it"),
                ),
                ("Critic", ScriptedModel::new().answer("skipped")),
            ],
            &[("Coder", "Planner"), ("Coder", "Critic")],
        );
        let ctx = ToolContext::new(Some(dir.path().to_path_buf()));
        let mut run = run_state(10);

        coord
            .execute(pending(HandoffRequest::parallel("Coder", ["Planner", "Critic"], "x")), &ctx, &mut run)
            .await
            .unwrap();

        assert!(run.branch_results.iter().all(|r| r.success));
        assert!(ctx.read_markers().is_empty());
    }
}
