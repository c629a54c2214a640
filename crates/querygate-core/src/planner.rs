//! The Planner: classifies the request once per run.

use tracing::{debug, warn};

use querygate_contracts::{
    action::ActionCatalog,
    error::{QueryGateError, QueryGateResult},
    reasoning::{CompletionOptions, Stage},
    run::{PlannerOutput, RunState, RunUpdate},
};

use crate::{
    prompt::planner_prompt,
    response::parse_verified,
    traits::{ReasoningPort, ResponseVerifier},
};

pub struct Planner<'a> {
    reasoning: &'a dyn ReasoningPort,
    verifier: &'a dyn ResponseVerifier,
    catalog: &'a ActionCatalog,
}

impl<'a> Planner<'a> {
    pub fn new(
        reasoning: &'a dyn ReasoningPort,
        verifier: &'a dyn ResponseVerifier,
        catalog: &'a ActionCatalog,
    ) -> Self {
        Self { reasoning, verifier, catalog }
    }

    /// Produce the run's guidance.
    ///
    /// Returns `None` when the run already has a plan. Never fails: any
    /// problem with the reasoning call yields `PlannerOutput::standard()`.
    pub async fn plan(&self, state: &RunState) -> Option<RunUpdate> {
        if state.plan.is_some() {
            return None;
        }

        let plan = match self.request_plan(&state.request).await {
            Ok(plan) => {
                debug!(run_id = %state.run_id, operation = ?plan.operation, "request planned");
                plan
            }
            Err(e) => {
                warn!(run_id = %state.run_id, error = %e, "planning failed, using standard guidance");
                PlannerOutput::standard()
            }
        };
        Some(RunUpdate::Planned(plan))
    }

    async fn request_plan(&self, request: &str) -> QueryGateResult<PlannerOutput> {
        let prompt = planner_prompt(request, self.catalog);
        let raw = self.reasoning.complete(&prompt, CompletionOptions::json()).await?;
        let value = parse_verified(&raw, Stage::Planner, self.verifier)?;
        serde_json::from_value(value).map_err(|e| QueryGateError::MalformedResponse {
            reason: format!("planner reply does not fit PlannerOutput: {e}"),
        })
    }
}
