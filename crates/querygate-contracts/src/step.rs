//! Steps: one proposed-then-executed (or denied) action each.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    action::ActionKind,
    assessment::ScopeAssessment,
    error::{QueryGateError, QueryGateResult},
    policy::PolicyDecision,
};

/// Unique identifier for a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub uuid::Uuid);

impl StepId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a step.
///
/// ```text
/// Pending ─┬─> Approved ─┬─> Completed
///          │             └─> Failed
///          └─> Denied
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Approved,
    Denied,
    Completed,
    Failed,
}

impl StepStatus {
    /// True if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Denied) | (Approved, Completed) | (Approved, Failed)
        )
    }

    /// Denied, Completed and Failed steps are never touched again.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Denied | StepStatus::Completed | StepStatus::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Approved => "approved",
            StepStatus::Denied => "denied",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The outcome of running a step against the database port.
///
/// An `error` makes the step `Failed`; the error text is fed back to the
/// Decider as self-correction context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful result carrying `data`.
    pub fn rows(data: Value, row_count: u64) -> Self {
        Self { success: true, data: Some(data), row_count: Some(row_count), error: None }
    }

    /// A failed result carrying the raw error text.
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, row_count: None, error: Some(error.into()) }
    }

    /// True when the result should mark its step `Failed`.
    pub fn is_failure(&self) -> bool {
        !self.success || self.error.is_some()
    }
}

/// One proposed-or-executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    /// Why the Decider chose this action.
    pub rationale: String,
    pub action: ActionKind,
    pub parameters: Map<String, Value>,
    pub status: StepStatus,
    pub assessment: Option<ScopeAssessment>,
    pub decision: Option<PolicyDecision>,
    pub result: Option<ExecutionResult>,
}

impl Step {
    /// Create a fresh `Pending` step.
    pub fn new(
        rationale: impl Into<String>,
        action: ActionKind,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            id: StepId::new(),
            rationale: rationale.into(),
            action,
            parameters,
            status: StepStatus::Pending,
            assessment: None,
            decision: None,
            result: None,
        }
    }

    /// Move the step to `next`, refusing any regression or skip.
    pub fn advance(&mut self, next: StepStatus) -> QueryGateResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(QueryGateError::StateMachine {
                reason: format!(
                    "step {} cannot move from '{}' to '{}'",
                    self.id, self.status, next
                ),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Same action kind with identical parameters.
    pub fn same_proposal(&self, other: &Step) -> bool {
        self.action == other.action && self.parameters == other.parameters
    }

    /// The string parameter `name`, if present.
    pub fn text_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }

    /// One-line description used in summaries and logs.
    pub fn describe(&self) -> String {
        let detail = match self.text_parameter("sql").or_else(|| self.text_parameter("table")) {
            Some(d) => format!("{}: {}", self.action, d),
            None => self.action.to_string(),
        };
        format!("{} ({})", detail, self.status)
    }
}
