//! Scenario 4: Step Budget
//!
//! An analyst asks for customer names under a budget of two steps. The
//! first query names a table that does not exist and fails; the failure is
//! fed back and the second query succeeds. The budget is then spent, so the
//! Decider closes the run as `Partial` without another reasoning call.

use querygate_contracts::{error::QueryGateResult, reasoning::Stage, run::RunState};
use querygate_core::{AgentConfig, RunRequest};

use super::{critique, harness, plan, print_outcome, query};
use crate::reasoning::ScriptedReasoning;

pub const QUESTION: &str = "List every customer's name.";

pub const MAX_STEPS: usize = 2;

pub const TYPO_SQL: &str = "SELECT name FROM customer";

pub const FIXED_SQL: &str = "SELECT name FROM customers ORDER BY id";

fn script() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_reply(Stage::Planner, plan(&["customers"], "lookup"))
        .with_reply(Stage::Decider, query("read customer names", TYPO_SQL))
        .with_reply(Stage::Reflector, critique(0.97, "read", false, &[]))
        .with_reply(Stage::Decider, query("the table is called customers", FIXED_SQL))
        .with_reply(Stage::Reflector, critique(0.97, "read", false, &[]))
}

pub async fn run() -> QueryGateResult<RunState> {
    let h = harness(script(), AgentConfig::default())?;
    let request = RunRequest::new(QUESTION).with_roles(["analyst"]).with_max_steps(MAX_STEPS);
    let state = h.orchestrator.execute(request).await;
    print_outcome(&state, &h.trace)?;
    Ok(state)
}

pub async fn run_scenario() -> QueryGateResult<()> {
    println!("=== Scenario 4: Step Budget ===");
    println!("  Caller: analyst, budget: {} steps", MAX_STEPS);
    println!("  Question: {}", QUESTION);
    println!();
    run().await?;
    println!();
    Ok(())
}
