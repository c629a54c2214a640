//! Core trait definitions for the QueryGate loop.
//!
//! These five traits define every boundary the loop talks across:
//!
//! - `ReasoningPort`   : untrusted, non-deterministic (a language model)
//! - `DatabasePort`    : the data the run is about
//! - `PolicyGate`      : trusted, deterministic gate between critique and execution
//! - `ResponseVerifier`: trusted checker for structured reasoning replies
//! - `EventSink`       : read-only side channel for progress and audit
//!
//! Ports are shared by concurrent runs and must handle their own internal
//! concurrency. The loop never holds more than one call in flight per run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use querygate_contracts::{
    caller::CallerContext,
    error::QueryGateResult,
    event::StepEvent,
    policy::PolicyDecision,
    reasoning::{CompletionOptions, Prompt},
    run::RunId,
    step::{ExecutionResult, Step},
    verify::{ResponseSchema, VerificationReport},
};

/// The natural-language reasoning capability.
///
/// Implementations may be wrong, slow, or return malformed text; every call
/// site in the loop catches errors and degrades to a stage-specific fallback.
/// Hard cancellation and timeouts belong inside the implementation.
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    /// Complete `prompt` and return the raw response text.
    async fn complete(&self, prompt: &Prompt, options: CompletionOptions) -> QueryGateResult<String>;
}

/// The relational database the run answers questions about.
#[async_trait]
pub trait DatabasePort: Send + Sync {
    /// Run one SQL statement with positional `params`.
    ///
    /// A statement the database rejects should come back as `Ok` with
    /// `error` set; `Err` is reserved for the port itself failing. The
    /// Executor treats both as a failed step.
    async fn execute(&self, sql: &str, params: &[Value]) -> QueryGateResult<ExecutionResult>;

    /// Return the table name → column names mapping.
    async fn get_schema(&self) -> QueryGateResult<BTreeMap<String, Vec<String>>>;
}

/// The deterministic authorization layer.
///
/// Implementations are **trusted** and must not perform I/O or call the
/// reasoning port.
pub trait PolicyGate: Send + Sync {
    /// Decide whether `step`, as assessed, may execute for `caller`.
    ///
    /// The step's assessment may be absent (reflection disabled); the gate
    /// must then fall back to inspecting the step itself.
    fn evaluate(&self, step: &Step, caller: &CallerContext) -> QueryGateResult<PolicyDecision>;
}

/// Structural and semantic checks on a parsed reasoning reply.
pub trait ResponseVerifier: Send + Sync {
    /// Verify `response` against `schema`, collecting every failure.
    fn verify(&self, response: &Value, schema: &ResponseSchema) -> QueryGateResult<VerificationReport>;
}

/// Receiver of step-stream events.
///
/// The loop never reads anything back, and a failing sink does not stop a
/// run: errors are logged and dropped.
pub trait EventSink: Send + Sync {
    /// Record one stage transition.
    fn record(&self, event: &StepEvent) -> QueryGateResult<()>;

    /// Mark a run as finished. Implementations may flush or seal here.
    fn finalize(&self, run_id: &RunId) -> QueryGateResult<()>;
}
