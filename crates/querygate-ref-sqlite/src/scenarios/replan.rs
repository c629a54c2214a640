//! Scenario 3: Replan After Critique
//!
//! An analyst asks for revenue per region. The first proposal groups
//! `orders` by a `region` column that only exists on `customers`; the
//! Reflector flags it at 0.80 confidence and the gate sends the critique
//! back to the Decider. The corrected join clears the threshold, runs, and
//! the run finishes with one denied and one executed step.

use querygate_contracts::{error::QueryGateResult, reasoning::Stage, run::RunState};
use querygate_core::{AgentConfig, RunRequest};

use super::{critique, finish, harness, plan, print_outcome, query};
use crate::reasoning::ScriptedReasoning;

pub const QUESTION: &str = "What is the total revenue per region?";

pub const FIRST_SQL: &str = "SELECT region, SUM(total) AS revenue FROM orders GROUP BY region";

pub const CORRECTED_SQL: &str = "SELECT c.region, SUM(o.total) AS revenue \
     FROM orders o JOIN customers c ON c.id = o.customer_id \
     GROUP BY c.region ORDER BY revenue DESC";

fn script() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_reply(Stage::Planner, plan(&["orders", "customers"], "aggregation"))
        .with_reply(Stage::Decider, query("sum order totals by region", FIRST_SQL))
        .with_reply(
            Stage::Reflector,
            critique(0.80, "read", false, &["orders has no region column; join customers on customer_id"]),
        )
        .with_reply(Stage::Decider, query("join customers to get each order's region", CORRECTED_SQL))
        .with_reply(Stage::Reflector, critique(0.97, "read", false, &[]))
        .with_reply(Stage::Decider, finish("success", "AMER leads revenue, followed by EMEA and APAC."))
}

pub async fn run() -> QueryGateResult<RunState> {
    let h = harness(script(), AgentConfig::default())?;
    let state = h.orchestrator.execute(RunRequest::new(QUESTION).with_roles(["analyst"])).await;
    print_outcome(&state, &h.trace)?;
    Ok(state)
}

pub async fn run_scenario() -> QueryGateResult<()> {
    println!("=== Scenario 3: Replan After Critique ===");
    println!("  Caller: analyst");
    println!("  Question: {}", QUESTION);
    println!();
    run().await?;
    println!();
    Ok(())
}
