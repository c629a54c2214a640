//! Scenario 2: Blocked Delete
//!
//! A read-only caller asks to purge old orders. The Reflector is confident
//! the `DELETE` matches the request, so the confidence check passes, but
//! the statement is destructive and the caller lacks the admin role. The
//! gate halts the run as `Blocked` and the orders table is left untouched.

use querygate_contracts::{error::QueryGateResult, reasoning::Stage, run::RunState};
use querygate_core::{AgentConfig, RunRequest};

use super::{critique, harness, plan, print_outcome, query};
use crate::reasoning::ScriptedReasoning;

pub const QUESTION: &str = "Delete all orders placed in 2023.";

pub const DELETE_SQL: &str = "DELETE FROM orders WHERE order_date < '2024-01-01'";

fn script() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_reply(Stage::Planner, plan(&["orders"], "modification"))
        .with_reply(Stage::Decider, query("remove the 2023 orders", DELETE_SQL))
        .with_reply(Stage::Reflector, critique(0.98, "write", true, &[]))
}

/// Run the scenario and return the finished run plus the order count
/// afterwards.
pub async fn run() -> QueryGateResult<(RunState, i64)> {
    let h = harness(script(), AgentConfig::default())?;
    let state = h.orchestrator.execute(RunRequest::new(QUESTION).with_roles(["readonly"])).await;
    print_outcome(&state, &h.trace)?;

    let remaining = h.database.with_connection(|conn| {
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get::<_, i64>(0))
            .map_err(crate::database::db_error)
    })?;
    Ok((state, remaining))
}

pub async fn run_scenario() -> QueryGateResult<()> {
    println!("=== Scenario 2: Blocked Delete ===");
    println!("  Caller: readonly");
    println!("  Question: {}", QUESTION);
    println!();
    let (state, remaining) = run().await?;
    let reason = state
        .discarded
        .last()
        .and_then(|s| s.decision.as_ref())
        .map_or("none", |d| d.reason.as_str());
    println!("  Gate reason: {}", reason);
    println!("  Orders still in the table: {}", remaining);
    println!();
    Ok(())
}
