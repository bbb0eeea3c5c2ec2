//! Handoff demo binary.
//!
//! Runs a three-agent agency through a parallel handoff with scripted models
//! and prints the resulting `ProcessOutput` as JSON.
//!
//! # Environment Variables
//!
//! - `AGENCY_*` — configuration overrides (see `AgencyConfig`)
//! - `RUST_LOG` — Tracing filter (default: "info,agency=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin handoff_demo -- [config.yaml]
//! ```

use std::sync::Arc;
use std::time::Duration;

use agency::{Agency, AgencyConfig, Agent, ScriptedModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; `log` records from the library are bridged.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agency=debug".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AgencyConfig::from_file(&path)?,
        None => AgencyConfig::default(),
    }
    .with_env_overrides()?;

    let coder = ScriptedModel::new()
        .handoff_aggregated(
            ["Planner", "Critic"],
            "Draft a plan and review the risks for adding a cache layer.",
            "Coder",
        )
        .answer("Implementing the cache: plan accepted, risks noted.");
    let planner = ScriptedModel::new()
        .with_delay(Duration::from_millis(30))
        .handoff(["Critic"], "Can you take the plan too?")
        .answer("1. Add an LRU in front of the store. 2. Invalidate on write.");
    let critic = ScriptedModel::new()
        .with_delay(Duration::from_millis(10))
        .answer("Watch for stale reads across processes.");

    let agency = Agency::builder()
        .agent(Agent::new("Coder", "Writes and changes code", Arc::new(coder)))
        .agent(Agent::new("Planner", "Breaks work into steps", Arc::new(planner)))
        .agent(Agent::new("Critic", "Reviews plans and code for risks", Arc::new(critic)))
        .bidirectional("Coder", "Planner")
        .bidirectional("Coder", "Critic")
        .edge("Planner", "Critic")
        .config(config)
        .on_event(|event| tracing::debug!(event = event.event_type(), "handoff event"))
        .build()?;

    let output = agency.process("Add a cache in front of the user store.").await;
    tracing::info!(
        status = %output.status,
        handoffs = output.handoffs_used,
        turns = output.turns_used,
        "request finished"
    );
    println!("{}", output.to_json()?);
    Ok(())
}
