//! The Decider: picks the next single action, or declares completion.
//!
//! Three rules are enforced here rather than trusted to the model:
//!
//! 1. The step budget is a hard ceiling. Once `step_count >= max_steps` the
//!    run completes as `Partial` without consulting the reasoning port.
//! 2. A step that just failed may not be proposed again verbatim.
//! 3. A step denied for low confidence may not be proposed again verbatim.
//!
//! A reply that breaks rule 2 or 3, or that cannot be parsed, is refused
//! and the model is asked again with a correction, up to
//! `AgentConfig::decider_retries` extra times.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use querygate_contracts::{
    action::{ActionCatalog, ActionKind},
    error::{QueryGateError, QueryGateResult},
    reasoning::{CompletionOptions, Stage},
    run::{Completion, RunState, RunStatus, RunUpdate},
    step::{Step, StepStatus},
};

use crate::{
    config::AgentConfig,
    prompt::{decider_prompt, DeciderContext},
    response::parse_verified,
    traits::{ReasoningPort, ResponseVerifier},
};

/// The raw reply shape.
#[derive(Debug, Deserialize)]
struct DeciderReply {
    #[serde(default)]
    rationale: String,
    action: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<RunStatus>,
}

enum Choice {
    Act(Step),
    Finish(Completion),
}

pub struct Decider<'a> {
    reasoning: &'a dyn ReasoningPort,
    verifier: &'a dyn ResponseVerifier,
    catalog: &'a ActionCatalog,
    config: &'a AgentConfig,
}

impl<'a> Decider<'a> {
    pub fn new(
        reasoning: &'a dyn ReasoningPort,
        verifier: &'a dyn ResponseVerifier,
        catalog: &'a ActionCatalog,
        config: &'a AgentConfig,
    ) -> Self {
        Self { reasoning, verifier, catalog, config }
    }

    /// Return either `RunUpdate::Proposed` with a new pending step or
    /// `RunUpdate::Completion`. Never fails.
    pub async fn decide(&self, state: &RunState) -> RunUpdate {
        if state.budget_exhausted() {
            info!(
                run_id = %state.run_id,
                step_count = state.step_count,
                max_steps = state.max_steps,
                "step budget exhausted, forcing completion"
            );
            return RunUpdate::Completion(Completion {
                status: RunStatus::Partial,
                summary: format!(
                    "Stopped after using the full budget of {} step(s); the request may be \
                     only partly answered.",
                    state.max_steps
                ),
            });
        }

        let attempts = 1 + self.config.decider_retries;
        let mut correction: Option<String> = None;

        for attempt in 1..=attempts {
            match self.ask(state, correction.as_deref()).await {
                Ok(Choice::Finish(completion)) => {
                    debug!(run_id = %state.run_id, status = %completion.status, "decider declared completion");
                    return RunUpdate::Completion(completion);
                }
                Ok(Choice::Act(step)) => match refusal(state, &step) {
                    None => {
                        debug!(
                            run_id = %state.run_id,
                            step_id = %step.id,
                            action = %step.action,
                            "decider proposed step"
                        );
                        return RunUpdate::Proposed(step);
                    }
                    Some(reason) => {
                        warn!(run_id = %state.run_id, attempt, %reason, "decider proposal refused");
                        correction = Some(reason);
                    }
                },
                Err(e) => {
                    warn!(run_id = %state.run_id, attempt, error = %e, "decider reply unusable");
                    correction = Some(format!(
                        "Your previous reply was unusable ({e}). Reply with exactly one JSON object."
                    ));
                }
            }
        }

        let status = if state.any_succeeded() { RunStatus::Partial } else { RunStatus::Failed };
        RunUpdate::Completion(Completion {
            status,
            summary: format!(
                "Could not settle on a next action after {} attempt(s): {}",
                attempts,
                correction.unwrap_or_default()
            ),
        })
    }

    async fn ask(&self, state: &RunState, correction: Option<&str>) -> QueryGateResult<Choice> {
        let prompt = decider_prompt(&DeciderContext {
            state,
            catalog: self.catalog,
            window: self.config.history_window,
            row_cap: self.config.history_row_cap,
            correction,
        });
        let raw = self.reasoning.complete(&prompt, CompletionOptions::json()).await?;
        let value = parse_verified(&raw, Stage::Decider, self.verifier)?;
        let reply: DeciderReply =
            serde_json::from_value(value).map_err(|e| QueryGateError::MalformedResponse {
                reason: format!("decider reply does not fit the expected shape: {e}"),
            })?;

        let action = ActionKind::new(reply.action.trim());
        if action.is_finish() {
            let summary = reply.summary.unwrap_or(reply.rationale);
            return Ok(Choice::Finish(Completion {
                status: reply.status.unwrap_or(RunStatus::Success),
                summary,
            }));
        }
        Ok(Choice::Act(Step::new(reply.rationale, action, reply.parameters)))
    }
}

/// Why `step` may not be proposed in `state`, if it may not.
fn refusal(state: &RunState, step: &Step) -> Option<String> {
    if let Some(last) = state.last_completed() {
        if last.status == StepStatus::Failed && step.same_proposal(last) {
            let error = last
                .result
                .as_ref()
                .and_then(|r| r.error.clone())
                .unwrap_or_default();
            return Some(format!(
                "The proposal repeats the step that just failed ({error}). Propose a corrected action."
            ));
        }
    }
    if let Some(rejection) = &state.rejection {
        if step.same_proposal(&rejection.step) {
            return Some(format!(
                "The proposal repeats the rejected one verbatim. Address these issues: {}",
                rejection.feedback.issues.join("; ")
            ));
        }
    }
    None
}
