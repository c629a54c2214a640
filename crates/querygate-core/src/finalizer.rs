//! The Finalizer: turns a terminated run into its user-facing summary.

use tracing::info;

use querygate_contracts::{
    display::TabularData,
    run::{RunState, RunStatus, RunSummary, RunUpdate, Termination},
    step::StepStatus,
};

#[derive(Debug, Default)]
pub struct Finalizer;

impl Finalizer {
    pub fn new() -> Self {
        Self
    }

    /// Build the run summary. Returns `None` when the run already has one.
    pub fn finalize(&self, state: &RunState) -> Option<RunUpdate> {
        if state.summary.is_some() {
            return None;
        }

        let (status, explanation) = match &state.termination {
            Some(Termination::Finished { status, summary }) => {
                let explanation = if summary.trim().is_empty() {
                    default_explanation(*status, state)
                } else {
                    summary.clone()
                };
                (*status, explanation)
            }
            Some(Termination::Blocked { reason }) => {
                (RunStatus::Blocked, format!("The request was blocked by policy: {reason}"))
            }
            Some(Termination::Aborted { reason }) => {
                (RunStatus::Failed, format!("The run aborted on an internal error: {reason}"))
            }
            None => (
                RunStatus::Failed,
                "The run ended without a terminal decision.".to_string(),
            ),
        };

        let data = state
            .completed
            .iter()
            .rev()
            .filter(|s| s.status == StepStatus::Completed)
            .find_map(|s| s.result.as_ref().and_then(|r| r.data.as_ref()))
            .and_then(TabularData::normalize);

        info!(
            run_id = %state.run_id,
            status = %status,
            steps = state.completed.len(),
            "run finalized"
        );

        Some(RunUpdate::Finalized(RunSummary {
            explanation,
            actions: state.completed.iter().map(|s| s.describe()).collect(),
            status,
            data,
        }))
    }
}

fn default_explanation(status: RunStatus, state: &RunState) -> String {
    match status {
        RunStatus::Success => format!("Answered in {} step(s).", state.completed.len()),
        RunStatus::Partial => format!(
            "Partly answered after {} step(s).",
            state.completed.len()
        ),
        RunStatus::Failed => "The request could not be answered.".to_string(),
        RunStatus::Blocked => "The request was blocked by policy.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use querygate_contracts::{
        caller::CallerContext,
        run::{Completion, RunState, RunStatus, RunUpdate, Termination},
        step::{ExecutionResult, StepStatus},
    };

    use super::*;
    use crate::testing::query_step;

    fn finished(status: RunStatus, summary: &str) -> RunState {
        let mut state = RunState::new("q", CallerContext::from_roles(["analyst"]), 5);
        state
            .apply(RunUpdate::Completion(Completion { status, summary: summary.to_string() }))
            .unwrap();
        state
    }

    fn summary_of(update: Option<RunUpdate>) -> RunSummary {
        match update {
            Some(RunUpdate::Finalized(summary)) => summary,
            other => panic!("expected a summary, got {other:?}"),
        }
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut state = finished(RunStatus::Success, "done");
        let update = Finalizer::new().finalize(&state);
        state.apply(update.unwrap()).unwrap();

        assert!(Finalizer::new().finalize(&state).is_none());
        assert_eq!(state.summary.as_ref().unwrap().explanation, "done");
    }

    #[test]
    fn blocked_run_reports_the_reason() {
        let mut state = RunState::new("q", CallerContext::from_roles(["readonly"]), 5);
        state.termination = Some(Termination::Blocked { reason: "requires role 'admin'".into() });

        let summary = summary_of(Finalizer::new().finalize(&state));

        assert_eq!(summary.status, RunStatus::Blocked);
        assert!(summary.explanation.contains("requires role 'admin'"));
    }

    #[test]
    fn data_comes_from_the_latest_successful_step() {
        let mut state = finished(RunStatus::Success, "");
        let mut first = query_step("SELECT 1");
        first.status = StepStatus::Completed;
        first.result = Some(ExecutionResult::rows(json!([{ "a": 1 }]), 1));
        let mut second = query_step("SELECT bad");
        second.status = StepStatus::Failed;
        second.result = Some(ExecutionResult::failure("boom"));
        state.completed = vec![first, second];

        let summary = summary_of(Finalizer::new().finalize(&state));

        assert_eq!(summary.actions.len(), 2);
        assert_eq!(summary.data.unwrap().columns, vec!["a".to_string()]);
        assert_eq!(summary.explanation, "Answered in 2 step(s).");
    }

    #[test]
    fn unterminated_run_is_failed() {
        let state = RunState::new("q", CallerContext::from_roles(["analyst"]), 5);
        let summary = summary_of(Finalizer::new().finalize(&state));
        assert_eq!(summary.status, RunStatus::Failed);
        assert!(summary.data.is_none());
    }
}
