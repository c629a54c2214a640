//! Run-level state threaded through the agent loop.
//!
//! `RunState` is owned by the orchestrator. Stages never mutate it: they read
//! `&RunState` and return a `RunUpdate`, and `RunState::apply` is the single
//! place where a diff is merged. `apply` is also where the lifecycle rules
//! are enforced, so a stage that returns a nonsensical update surfaces as a
//! `StateMachine` error instead of corrupting the run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    assessment::ScopeAssessment,
    caller::CallerContext,
    display::TabularData,
    error::{QueryGateError, QueryGateResult},
    policy::{DecisionCategory, PolicyDecision, ReplanFeedback},
    step::{Step, StepStatus},
};

/// Unique identifier for one run (one user request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The operation category the Planner detected in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    Lookup,
    Aggregation,
    Ranking,
    Comparison,
    Trend,
    Schema,
    Modification,
    #[serde(other)]
    Standard,
}

/// Guidance produced once per run by the Planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerOutput {
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub measure: Option<String>,
    #[serde(alias = "operation_category", default = "standard_category")]
    pub operation: IntentCategory,
    #[serde(default)]
    pub constraint: Option<String>,
    /// How ambiguous phrasing in the request was resolved.
    #[serde(default)]
    pub interpretation: Option<String>,
}

fn standard_category() -> IntentCategory {
    IntentCategory::Standard
}

impl PlannerOutput {
    /// Fallback guidance used when planning fails.
    pub fn standard() -> Self {
        Self {
            entities: vec![],
            measure: None,
            operation: IntentCategory::Standard,
            constraint: None,
            interpretation: None,
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
    Blocked,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
            RunStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

/// The user-facing result of a run, produced by the Finalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub explanation: String,
    /// Descriptions of the executed steps, in execution order.
    pub actions: Vec<String>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TabularData>,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// The Decider declared completion (possibly forced by the step budget).
    Finished { status: RunStatus, summary: String },
    /// The Policy Gate issued an authorization denial.
    Blocked { reason: String },
    /// The orchestrator's own bookkeeping failed.
    Aborted { reason: String },
}

/// The Decider's completion declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub status: RunStatus,
    pub summary: String,
}

/// A confidence-denied step plus the critique that sank it.
///
/// Held until the next Decider cycle consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub step: Step,
    pub feedback: ReplanFeedback,
}

/// A partial update returned by one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Planned(PlannerOutput),
    Proposed(Step),
    Completion(Completion),
    Assessed(ScopeAssessment),
    Decided(PolicyDecision),
    Executed(Step),
    Finalized(RunSummary),
}

/// The aggregate threaded through the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: RunId,
    pub request: String,
    pub caller: CallerContext,
    pub plan: Option<PlannerOutput>,
    /// Executed steps, append-only, in execution order.
    pub completed: Vec<Step>,
    /// Steps denied by the Policy Gate, in denial order.
    pub discarded: Vec<Step>,
    /// At most one in-flight step.
    pub current: Option<Step>,
    pub rejection: Option<Rejection>,
    /// Number of steps proposed so far, denied ones included.
    pub step_count: usize,
    pub max_steps: usize,
    pub termination: Option<Termination>,
    pub summary: Option<RunSummary>,
}

impl RunState {
    pub fn new(request: impl Into<String>, caller: CallerContext, max_steps: usize) -> Self {
        Self {
            run_id: RunId::new(),
            request: request.into(),
            caller,
            plan: None,
            completed: Vec::new(),
            discarded: Vec::new(),
            current: None,
            rejection: None,
            step_count: 0,
            max_steps,
            termination: None,
            summary: None,
        }
    }

    /// True once the step budget is used up.
    pub fn budget_exhausted(&self) -> bool {
        self.step_count >= self.max_steps
    }

    /// The most recently executed step.
    pub fn last_completed(&self) -> Option<&Step> {
        self.completed.last()
    }

    /// True if at least one executed step succeeded.
    pub fn any_succeeded(&self) -> bool {
        self.completed.iter().any(|s| s.status == StepStatus::Completed)
    }

    /// Merge one stage's update into the run.
    ///
    /// # Errors
    ///
    /// `QueryGateError::StateMachine` when the update does not fit the
    /// current state: a second in-flight step, a proposal past the budget, an
    /// assessment with nothing in flight, an executed step that was never
    /// approved, and so on.
    pub fn apply(&mut self, update: RunUpdate) -> QueryGateResult<()> {
        match update {
            RunUpdate::Planned(plan) => {
                if self.plan.is_none() {
                    self.plan = Some(plan);
                }
                Ok(())
            }

            RunUpdate::Proposed(step) => {
                if self.termination.is_some() {
                    return Err(fault("step proposed after the run terminated"));
                }
                if self.current.is_some() {
                    return Err(fault("step proposed while another step is in flight"));
                }
                if self.budget_exhausted() {
                    return Err(fault(format!(
                        "step proposed past the step budget of {}",
                        self.max_steps
                    )));
                }
                if step.status != StepStatus::Pending {
                    return Err(fault(format!("proposed step has status '{}'", step.status)));
                }
                self.current = Some(step);
                self.step_count += 1;
                self.rejection = None;
                Ok(())
            }

            RunUpdate::Completion(completion) => {
                if self.current.is_some() {
                    return Err(fault("completion declared while a step is in flight"));
                }
                if self.termination.is_none() {
                    self.termination = Some(Termination::Finished {
                        status: completion.status,
                        summary: completion.summary,
                    });
                }
                Ok(())
            }

            RunUpdate::Assessed(assessment) => {
                let step = self.pending_step()?;
                step.assessment = Some(assessment);
                Ok(())
            }

            RunUpdate::Decided(decision) => {
                let step = self.pending_step()?;
                if decision.approved {
                    step.advance(StepStatus::Approved)?;
                    step.decision = Some(decision);
                    return Ok(());
                }

                step.advance(StepStatus::Denied)?;
                step.decision = Some(decision.clone());
                let denied = self
                    .current
                    .take()
                    .ok_or_else(|| fault("denied step vanished"))?;

                if decision.category == DecisionCategory::ConfidenceDenied {
                    self.rejection = Some(Rejection {
                        step: denied.clone(),
                        feedback: decision.feedback.unwrap_or_default(),
                    });
                } else {
                    self.termination = Some(Termination::Blocked { reason: decision.reason });
                }
                self.discarded.push(denied);
                Ok(())
            }

            RunUpdate::Executed(step) => {
                let current = self
                    .current
                    .as_ref()
                    .ok_or_else(|| fault("executed step with nothing in flight"))?;
                if current.id != step.id {
                    return Err(fault(format!(
                        "executed step {} is not the in-flight step {}",
                        step.id, current.id
                    )));
                }
                if current.status != StepStatus::Approved {
                    return Err(fault(format!(
                        "step {} executed without approval (status '{}')",
                        step.id, current.status
                    )));
                }
                if !matches!(step.status, StepStatus::Completed | StepStatus::Failed) {
                    return Err(fault(format!(
                        "executed step {} has non-final status '{}'",
                        step.id, step.status
                    )));
                }
                self.current = None;
                self.completed.push(step);
                Ok(())
            }

            RunUpdate::Finalized(summary) => {
                if self.summary.is_none() {
                    self.summary = Some(summary);
                }
                Ok(())
            }
        }
    }

    fn pending_step(&mut self) -> QueryGateResult<&mut Step> {
        match self.current.as_mut() {
            Some(step) if step.status == StepStatus::Pending => Ok(step),
            Some(step) => Err(fault(format!(
                "step {} is '{}', expected 'pending'",
                step.id, step.status
            ))),
            None => Err(fault("no step in flight")),
        }
    }
}

fn fault(reason: impl Into<String>) -> QueryGateError {
    QueryGateError::StateMachine { reason: reason.into() }
}
