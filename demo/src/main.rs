//! QueryGate SQLite Reference Runtime: Demo CLI
//!
//! Runs the scripted scenarios, or answers a live question through an
//! OpenAI-compatible model endpoint.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- list-tables
//!   cargo run -p demo -- blocked-delete
//!   cargo run -p demo -- replan
//!   cargo run -p demo -- budget
//!   cargo run -p demo -- ask "Which region has the most revenue?" --roles analyst

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use querygate_audit::InMemoryTraceWriter;
use querygate_contracts::{error::QueryGateResult, run::RunState};
use querygate_core::{AgentConfig, Orchestrator, RunRequest};
use querygate_policy::ThresholdPolicyGate;
use querygate_ref_sqlite::{
    scenarios::{self, blocked_delete, budget, list_tables, replan},
    HttpReasoningClient, ReasoningConfig, SqliteDatabase, DEFAULT_POLICY,
};
use querygate_verify::SchemaVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// QueryGate: a policy-gated natural-language to SQL agent.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "QueryGate SQLite reference runtime demo",
    long_about = "Runs QueryGate scenarios showing scope reflection, confidence gating,\n\
                  role-based blocking, step budgets, and trace chain integrity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scripted scenarios in sequence.
    RunAll,
    /// Scenario 1: List Tables (introspection without critique).
    ListTables,
    /// Scenario 2: Blocked Delete (destructive statement, read-only caller).
    BlockedDelete,
    /// Scenario 3: Replan After Critique (low confidence, corrected query).
    Replan,
    /// Scenario 4: Step Budget (failed step, then partial completion).
    Budget,
    /// Answer a question with a live model endpoint.
    Ask(AskArgs),
}

#[derive(clap::Args)]
struct AskArgs {
    /// The natural-language question.
    question: String,

    /// SQLite database file. Defaults to the in-memory sample shop.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Caller roles, comma separated. Defaults to the configured roles.
    #[arg(long, value_delimiter = ',')]
    roles: Option<Vec<String>>,

    /// Step budget for this run.
    #[arg(long)]
    max_steps: Option<usize>,

    /// Config file with [agent] and [reasoning] tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Policy file. Defaults to the built-in policy.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Print the run summary as JSON instead of a report.
    #[arg(long)]
    json: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command).await {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

/// Errors reach the CLI from the runtime and from rendering its output.
type DemoResult = Result<(), Box<dyn Error>>;

async fn dispatch(command: Command) -> DemoResult {
    match command {
        Command::RunAll => {
            print_banner();
            run_all().await?;
        }
        Command::ListTables => {
            print_banner();
            list_tables::run_scenario().await?;
        }
        Command::BlockedDelete => {
            print_banner();
            blocked_delete::run_scenario().await?;
        }
        Command::Replan => {
            print_banner();
            replan::run_scenario().await?;
        }
        Command::Budget => {
            print_banner();
            budget::run_scenario().await?;
        }
        Command::Ask(args) => ask(args).await?,
    }
    Ok(())
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all() -> QueryGateResult<()> {
    list_tables::run_scenario().await?;
    blocked_delete::run_scenario().await?;
    replan::run_scenario().await?;
    budget::run_scenario().await?;
    println!("All scenarios completed.");
    Ok(())
}

// ── Live question ─────────────────────────────────────────────────────────────

async fn ask(args: AskArgs) -> DemoResult {
    let (agent, reasoning) = match &args.config {
        Some(path) => (AgentConfig::from_file(path)?, ReasoningConfig::from_file(path)?),
        None => (AgentConfig::default(), ReasoningConfig::default()),
    };
    let policy = match &args.policy {
        Some(path) => ThresholdPolicyGate::from_file(path)?,
        None => ThresholdPolicyGate::from_toml_str(DEFAULT_POLICY)?,
    };
    let database = match &args.db {
        Some(path) => SqliteDatabase::open(path)?,
        None => SqliteDatabase::sample()?,
    };
    info!(model = %reasoning.model, endpoint = %reasoning.base_url, "answering live question");

    let trace = InMemoryTraceWriter::new();
    let orchestrator = Orchestrator::new(
        Arc::new(HttpReasoningClient::new(reasoning)?),
        Arc::new(database),
        Box::new(policy),
        Box::new(SchemaVerifier::new()),
        agent,
    )
    .with_events(Arc::new(trace.clone()));

    let mut request = RunRequest::new(args.question);
    if let Some(roles) = args.roles {
        request = request.with_roles(roles);
    }
    if let Some(max_steps) = args.max_steps {
        request = request.with_max_steps(max_steps);
    }

    let state = orchestrator.execute(request).await;
    if args.json {
        println!("{}", render_summary(&state)?);
        return Ok(());
    }
    scenarios::print_outcome(&state, &trace)?;
    Ok(())
}

fn render_summary(state: &RunState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&state.summary)
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("QueryGate: Policy-gated NL to SQL");
    println!("SQLite Reference Demo");
    println!("=================================");
    println!();
    println!("QueryGate pipeline per step:");
    println!("  [1] Decider proposes one action from the catalog (budget permitting)");
    println!("  [2] Scope Reflector critiques it: confidence, risk, operation type");
    println!("  [3] Policy Gate: confidence must exceed 0.95, roles must permit the operation");
    println!("  [4] Executor runs the step ONLY after the gate approves it");
    println!("  [5] Every transition is appended to a SHA-256 hash-chained trace");
    println!();
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use querygate_ref_sqlite::scenarios::list_tables;

    use super::render_summary;

    #[tokio::test]
    async fn json_summary_carries_status_and_table() {
        let state = list_tables::run().await.unwrap();
        let value: Value = serde_json::from_str(&render_summary(&state).unwrap()).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["columns"][0], "table");
    }
}
