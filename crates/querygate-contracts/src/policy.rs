//! Policy decision types.
//!
//! The Policy Gate consumes a step (with its assessment) plus the caller's
//! roles and produces a `PolicyDecision`. Only `Allowed` lets the Executor
//! touch the database.

use serde::{Deserialize, Serialize};

/// The category of a Policy Gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionCategory {
    /// The step may execute.
    Allowed,
    /// The caller's roles forbid the step. Terminal for the run.
    Denied,
    /// The critique is not confident enough. The Decider must replan.
    ConfidenceDenied,
    /// The step needs a role the caller does not hold. Terminal for the run.
    RequiresApproval,
}

/// Where the orchestrator goes after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRoute {
    Execute,
    Replan,
    Halt,
}

/// Critique feedback handed back to the Decider after a confidence denial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplanFeedback {
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Outcome of the Policy Gate for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub approved: bool,
    pub category: DecisionCategory,
    /// Human-readable explanation, surfaced in the run summary when terminal.
    pub reason: String,
    /// Present only for confidence denials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<ReplanFeedback>,
}

impl PolicyDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            category: DecisionCategory::Allowed,
            reason: reason.into(),
            feedback: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            category: DecisionCategory::Denied,
            reason: reason.into(),
            feedback: None,
        }
    }

    pub fn require_approval(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            category: DecisionCategory::RequiresApproval,
            reason: reason.into(),
            feedback: None,
        }
    }

    pub fn confidence_denied(reason: impl Into<String>, feedback: ReplanFeedback) -> Self {
        Self {
            approved: false,
            category: DecisionCategory::ConfidenceDenied,
            reason: reason.into(),
            feedback: Some(feedback),
        }
    }

    /// Map the decision onto the orchestrator's next move.
    pub fn route(&self) -> PolicyRoute {
        match self.category {
            DecisionCategory::Allowed => PolicyRoute::Execute,
            DecisionCategory::ConfidenceDenied => PolicyRoute::Replan,
            DecisionCategory::Denied | DecisionCategory::RequiresApproval => PolicyRoute::Halt,
        }
    }
}
