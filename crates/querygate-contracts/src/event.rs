//! Step-stream events: a read-only side channel for progress display and
//! the audit trace. Nothing in the loop reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{run::RunId, step::Step};

/// Which stage transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepEventKind {
    Planned,
    Proposed,
    Assessed,
    Approved,
    Denied,
    Executed,
    Finalized,
}

/// One stage transition of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub run_id: RunId,
    pub kind: StepEventKind,
    /// Snapshot of the step the transition concerns, if any.
    pub step: Option<Step>,
    /// Stage-specific payload (plan, decision reason, summary, ...).
    pub detail: Value,
    pub timestamp: DateTime<Utc>,
}

impl StepEvent {
    pub fn new(run_id: RunId, kind: StepEventKind, step: Option<Step>, detail: Value) -> Self {
        Self { run_id, kind, step, detail, timestamp: Utc::now() }
    }
}
