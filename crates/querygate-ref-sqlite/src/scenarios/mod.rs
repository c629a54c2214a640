//! Deterministic demo scenarios.
//!
//! Each scenario wires the real gate, verifier, trace writer and a freshly
//! seeded SQLite database to a `ScriptedReasoning` port, so the loop's
//! behavior is reproducible without a model endpoint.

pub mod blocked_delete;
pub mod budget;
pub mod list_tables;
pub mod replan;

use std::sync::Arc;

use serde_json::{json, Value};

use querygate_audit::InMemoryTraceWriter;
use querygate_contracts::{error::QueryGateResult, run::RunState};
use querygate_core::{AgentConfig, Orchestrator};
use querygate_policy::ThresholdPolicyGate;
use querygate_verify::SchemaVerifier;

use crate::{database::SqliteDatabase, reasoning::ScriptedReasoning, DEFAULT_POLICY};

// ── Wiring ────────────────────────────────────────────────────────────────────

/// An orchestrator over the sample database plus the trace it writes to.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub database: SqliteDatabase,
    pub trace: InMemoryTraceWriter,
}

pub fn harness(reasoning: ScriptedReasoning, config: AgentConfig) -> QueryGateResult<Harness> {
    let database = SqliteDatabase::sample()?;
    let trace = InMemoryTraceWriter::new();
    let orchestrator = Orchestrator::new(
        Arc::new(reasoning),
        Arc::new(database.clone()),
        Box::new(ThresholdPolicyGate::from_toml_str(DEFAULT_POLICY)?),
        Box::new(SchemaVerifier::new()),
        config,
    )
    .with_events(Arc::new(trace.clone()));
    Ok(Harness { orchestrator, database, trace })
}

// ── Scripted replies ──────────────────────────────────────────────────────────

pub(crate) fn plan(entities: &[&str], operation: &str) -> String {
    json!({ "entities": entities, "operation": operation }).to_string()
}

pub(crate) fn act(rationale: &str, action: &str, parameters: Value) -> String {
    json!({ "rationale": rationale, "action": action, "parameters": parameters }).to_string()
}

pub(crate) fn query(rationale: &str, sql: &str) -> String {
    act(rationale, "execute_query", json!({ "sql": sql }))
}

pub(crate) fn finish(status: &str, summary: &str) -> String {
    json!({ "rationale": "the question is answered", "action": "finish", "status": status, "summary": summary })
        .to_string()
}

pub(crate) fn critique(confidence: f64, operation: &str, destructive: bool, issues: &[&str]) -> String {
    json!({
        "confidence": confidence,
        "complexity": if destructive { 3 } else { 2 },
        "risk": if destructive { "high" } else { "low" },
        "operation": operation,
        "destructive": destructive,
        "issues": issues,
        "suggestions": [],
        "intent_alignment": if issues.is_empty() { "matches the request" } else { "partly matches the request" }
    })
    .to_string()
}

// ── Reporting ─────────────────────────────────────────────────────────────────

/// Print a finished run: summary, executed and denied steps, result table
/// and trace status.
pub fn print_outcome(state: &RunState, trace: &InMemoryTraceWriter) -> QueryGateResult<()> {
    let Some(summary) = &state.summary else {
        println!("  (no summary)");
        return Ok(());
    };

    println!("  Status:      {}", summary.status);
    println!("  Explanation: {}", summary.explanation);
    println!("  Steps used:  {}/{}", state.step_count, state.max_steps);
    for action in &summary.actions {
        println!("    - {}", action);
    }
    for denied in &state.discarded {
        println!("    ✗ {}", denied.describe());
    }

    if let Some(data) = &summary.data {
        println!("  Result ({} row(s)):", data.row_count());
        println!("    {}", data.columns.join(" | "));
        for row in &data.rows {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            println!("    {}", cells.join(" | "));
        }
    }

    let entries = trace.export_trace(&state.run_id)?.map_or(0, |t| t.entries.len());
    let intact = trace.verify_integrity(&state.run_id)?;
    println!(
        "  Trace:       {} event(s), chain {}",
        entries,
        if intact { "VALID" } else { "BROKEN" }
    );
    Ok(())
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
