//! Scenario 1: List Tables
//!
//! A read-only caller asks which tables exist. The Decider picks
//! `get_schema`, an introspection action: the Reflector skips its critique,
//! the gate approves it as exempt, and the run finishes on the next cycle.

use serde_json::json;

use querygate_contracts::{error::QueryGateResult, reasoning::Stage, run::RunState};
use querygate_core::{AgentConfig, RunRequest};

use super::{act, finish, harness, plan, print_outcome};
use crate::reasoning::ScriptedReasoning;

pub const QUESTION: &str = "What tables are in the database?";

fn script() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_reply(Stage::Planner, plan(&[], "schema"))
        .with_reply(Stage::Decider, act("read the catalog", "get_schema", json!({})))
        .with_reply(
            Stage::Decider,
            finish("success", "The database has three tables: customers, orders and products."),
        )
}

/// Run the scenario and return the finished run.
pub async fn run() -> QueryGateResult<RunState> {
    let h = harness(script(), AgentConfig::default())?;
    let state = h.orchestrator.execute(RunRequest::new(QUESTION).with_roles(["readonly"])).await;
    print_outcome(&state, &h.trace)?;
    Ok(state)
}

pub async fn run_scenario() -> QueryGateResult<()> {
    println!("=== Scenario 1: List Tables ===");
    println!("  Caller: readonly");
    println!("  Question: {}", QUESTION);
    println!();
    run().await?;
    println!();
    Ok(())
}
