//! The orchestrator: the single owner of a run's state.
//!
//! The orchestrator enforces the QueryGate execution model:
//!
//!   Plan → ( Decide → Reflect → Gate → Execute )* → Finalize
//!
//! The safety invariant is structural: the Executor is only reachable after
//! `PolicyGate::evaluate()` returned an approving decision for the very step
//! in flight, and `RunState::apply` refuses to record an executed step that
//! was never approved.
//!
//! Stages never mutate the run. Each returns a `RunUpdate` and `commit`
//! applies it, emits the matching `StepEvent`, and moves on.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use querygate_contracts::{
    action::ActionCatalog,
    caller::CallerContext,
    error::{QueryGateError, QueryGateResult},
    event::{StepEvent, StepEventKind},
    policy::PolicyRoute,
    run::{RunState, RunStatus, RunSummary, RunUpdate, Termination},
};

use crate::{
    config::AgentConfig,
    decider::Decider,
    executor::Executor,
    finalizer::Finalizer,
    planner::Planner,
    reflector::Reflector,
    traits::{DatabasePort, EventSink, PolicyGate, ReasoningPort, ResponseVerifier},
};

/// One user request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub question: String,
    /// Caller roles. `None` means "no context supplied" and picks up
    /// `AgentConfig::default_roles`.
    pub roles: Option<Vec<String>>,
    /// Step budget override.
    pub max_steps: Option<usize>,
}

impl RunRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), roles: None, max_steps: None }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Drives runs from request to summary.
///
/// One orchestrator may serve many concurrent runs: it holds only shared,
/// stateless collaborators and per-run state lives on the stack of `execute`.
pub struct Orchestrator {
    reasoning: Arc<dyn ReasoningPort>,
    database: Arc<dyn DatabasePort>,
    policy: Box<dyn PolicyGate>,
    verifier: Box<dyn ResponseVerifier>,
    events: Option<Arc<dyn EventSink>>,
    catalog: ActionCatalog,
    config: AgentConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the given ports with the default catalog.
    pub fn new(
        reasoning: Arc<dyn ReasoningPort>,
        database: Arc<dyn DatabasePort>,
        policy: Box<dyn PolicyGate>,
        verifier: Box<dyn ResponseVerifier>,
        config: AgentConfig,
    ) -> Self {
        Self {
            reasoning,
            database,
            policy,
            verifier,
            events: None,
            catalog: ActionCatalog::default(),
            config,
        }
    }

    /// Attach a step-stream sink.
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Replace the action catalog.
    pub fn with_catalog(mut self, catalog: ActionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer one request and return the Finalizer's summary.
    ///
    /// Never fails: a broken run comes back with status `Failed`.
    pub async fn run(&self, request: RunRequest) -> RunSummary {
        let state = self.execute(request).await;
        state.summary.unwrap_or_else(|| RunSummary {
            explanation: "The run produced no summary.".to_string(),
            actions: Vec::new(),
            status: RunStatus::Failed,
            data: None,
        })
    }

    /// Answer one request and return the complete run state, summary included.
    pub async fn execute(&self, request: RunRequest) -> RunState {
        let roles = request.roles.unwrap_or_else(|| self.config.default_roles.clone());
        let max_steps = request.max_steps.unwrap_or(self.config.max_steps);
        let mut state = RunState::new(request.question, CallerContext::from_roles(roles), max_steps);

        info!(run_id = %state.run_id, max_steps, request = %state.request, "run starting");

        if let Err(e) = self.drive(&mut state).await {
            error!(run_id = %state.run_id, error = %e, "run aborted");
            state.termination = Some(Termination::Aborted { reason: e.to_string() });
        }

        if let Some(update) = Finalizer::new().finalize(&state) {
            if let Err(e) = self.commit(&mut state, update) {
                error!(run_id = %state.run_id, error = %e, "could not record run summary");
            }
        }
        if let Some(sink) = &self.events {
            if let Err(e) = sink.finalize(&state.run_id) {
                warn!(run_id = %state.run_id, error = %e, "event sink finalize failed");
            }
        }

        info!(
            run_id = %state.run_id,
            status = ?state.summary.as_ref().map(|s| s.status),
            steps = state.completed.len(),
            denied = state.discarded.len(),
            "run finished"
        );
        state
    }

    async fn drive(&self, state: &mut RunState) -> QueryGateResult<()> {
        let reasoning = self.reasoning.as_ref();
        let verifier = self.verifier.as_ref();

        let planner = Planner::new(reasoning, verifier, &self.catalog);
        let decider = Decider::new(reasoning, verifier, &self.catalog, &self.config);
        let reflector = Reflector::new(reasoning, verifier, &self.catalog, &self.config);
        let executor = Executor::new(self.database.as_ref());

        // ── Plan ─────────────────────────────────────────────────────────────
        if let Some(update) = planner.plan(state).await {
            self.commit(state, update)?;
        }

        while state.termination.is_none() {
            // ── Decide ───────────────────────────────────────────────────────
            let update = decider.decide(state).await;
            let proposed = matches!(update, RunUpdate::Proposed(_));
            self.commit(state, update)?;
            if !proposed {
                continue;
            }

            // ── Reflect ──────────────────────────────────────────────────────
            if self.config.reflection_enabled {
                let step = in_flight(state)?;
                let update = reflector.assess(state, &step).await;
                self.commit(state, update)?;
            }

            // ── Gate ─────────────────────────────────────────────────────────
            //
            // Nothing reaches the database unless this returns Execute.
            let step = in_flight(state)?;
            let decision = self.policy.evaluate(&step, &state.caller)?;
            let route = decision.route();
            info!(
                run_id = %state.run_id,
                step_id = %step.id,
                category = ?decision.category,
                reason = %decision.reason,
                "policy decision"
            );
            self.commit(state, RunUpdate::Decided(decision))?;

            // ── Execute ──────────────────────────────────────────────────────
            match route {
                PolicyRoute::Execute => {
                    let update = executor.execute(state).await?;
                    self.commit(state, update)?;
                }
                // `apply` already recorded the rejection or the termination.
                PolicyRoute::Replan | PolicyRoute::Halt => {}
            }
        }
        Ok(())
    }

    /// Apply `update` and emit its event.
    fn commit(&self, state: &mut RunState, update: RunUpdate) -> QueryGateResult<()> {
        let (kind, detail) = describe(&update);
        state.apply(update)?;

        if let (Some(sink), Some(kind)) = (&self.events, kind) {
            let step = match kind {
                StepEventKind::Proposed | StepEventKind::Assessed | StepEventKind::Approved => {
                    state.current.clone()
                }
                StepEventKind::Denied => state.discarded.last().cloned(),
                StepEventKind::Executed => state.completed.last().cloned(),
                StepEventKind::Planned | StepEventKind::Finalized => None,
            };
            let event = StepEvent::new(state.run_id, kind, step, detail);
            if let Err(e) = sink.record(&event) {
                warn!(run_id = %state.run_id, error = %e, "event sink rejected event");
            }
        }
        Ok(())
    }
}

fn in_flight(state: &RunState) -> QueryGateResult<querygate_contracts::step::Step> {
    state.current.clone().ok_or_else(|| QueryGateError::StateMachine {
        reason: "expected a step in flight".to_string(),
    })
}

/// The event kind and payload for an update. Completions are reported by
/// the Finalized event that always follows them.
fn describe(update: &RunUpdate) -> (Option<StepEventKind>, Value) {
    match update {
        RunUpdate::Planned(plan) => (
            Some(StepEventKind::Planned),
            serde_json::to_value(plan).unwrap_or(Value::Null),
        ),
        RunUpdate::Proposed(_) => (Some(StepEventKind::Proposed), Value::Null),
        RunUpdate::Completion(_) => (None, Value::Null),
        RunUpdate::Assessed(a) => (
            Some(StepEventKind::Assessed),
            json!({ "confidence": a.confidence, "risk": a.risk }),
        ),
        RunUpdate::Decided(d) => {
            let kind = if d.approved { StepEventKind::Approved } else { StepEventKind::Denied };
            (Some(kind), json!({ "category": d.category, "reason": d.reason }))
        }
        RunUpdate::Executed(_) => (Some(StepEventKind::Executed), Value::Null),
        RunUpdate::Finalized(summary) => (
            Some(StepEventKind::Finalized),
            json!({ "status": summary.status, "explanation": summary.explanation }),
        ),
    }
}
