//! The Scope Reflector: critiques a proposed step before it runs.
//!
//! From the orchestrator's point of view this is a pure function of the step
//! and the run so far. It never executes anything and only returns an
//! assessment.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use querygate_contracts::{
    action::ActionCatalog,
    assessment::{ScopeAssessment, REQUIREMENTS_MET_CONFIDENCE},
    error::{QueryGateError, QueryGateResult},
    reasoning::{CompletionOptions, Stage},
    run::{RunState, RunUpdate},
    step::Step,
    verify::ResponseSchema,
};

use crate::{
    config::AgentConfig,
    prompt::reflector_prompt,
    response::extract_json,
    traits::{ReasoningPort, ResponseVerifier},
};

/// Alternate key spellings models use, mapped to the canonical field.
const KEY_ALIASES: [(&str, &str); 5] = [
    ("confidence_score", "confidence"),
    ("complexity_score", "complexity"),
    ("risk_level", "risk"),
    ("operation_type", "operation"),
    ("is_destructive", "destructive"),
];

pub struct Reflector<'a> {
    reasoning: &'a dyn ReasoningPort,
    verifier: &'a dyn ResponseVerifier,
    catalog: &'a ActionCatalog,
    config: &'a AgentConfig,
}

impl<'a> Reflector<'a> {
    pub fn new(
        reasoning: &'a dyn ReasoningPort,
        verifier: &'a dyn ResponseVerifier,
        catalog: &'a ActionCatalog,
        config: &'a AgentConfig,
    ) -> Self {
        Self { reasoning, verifier, catalog, config }
    }

    /// Return `RunUpdate::Assessed` for `step`. Never fails.
    ///
    /// - introspection actions get `ScopeAssessment::introspection()` with no
    ///   reasoning call;
    /// - an unobtainable or unparsable critique becomes
    ///   `ScopeAssessment::unparseable`;
    /// - a fully satisfied requirements checklist lifts confidence to at
    ///   least `REQUIREMENTS_MET_CONFIDENCE`.
    pub async fn assess(&self, state: &RunState, step: &Step) -> RunUpdate {
        if self.catalog.is_introspection(&step.action) {
            debug!(run_id = %state.run_id, step_id = %step.id, action = %step.action, "introspection action, skipping critique");
            return RunUpdate::Assessed(ScopeAssessment::introspection());
        }

        let mut assessment = match self.critique(state, step).await {
            Ok(a) => a,
            Err(e) => {
                warn!(run_id = %state.run_id, step_id = %step.id, error = %e, "critique unusable, rejecting step");
                ScopeAssessment::unparseable(e.to_string())
            }
        };

        if assessment.all_requirements_met() && assessment.confidence < REQUIREMENTS_MET_CONFIDENCE {
            debug!(
                run_id = %state.run_id,
                step_id = %step.id,
                raw_confidence = assessment.confidence,
                "all requirements satisfied, raising confidence"
            );
            assessment.confidence = REQUIREMENTS_MET_CONFIDENCE;
        }

        debug!(
            run_id = %state.run_id,
            step_id = %step.id,
            confidence = assessment.confidence,
            complexity = assessment.complexity,
            risk = ?assessment.risk,
            "step assessed"
        );
        RunUpdate::Assessed(assessment)
    }

    async fn critique(&self, state: &RunState, step: &Step) -> QueryGateResult<ScopeAssessment> {
        let prompt = reflector_prompt(
            state,
            step,
            self.config.history_window,
            self.config.history_row_cap,
        );
        let raw = self.reasoning.complete(&prompt, CompletionOptions::json()).await?;

        let mut value = extract_json(&raw)?;
        canonicalize(&mut value);

        let report = self
            .verifier
            .verify(&value, &ResponseSchema::for_stage(Stage::Reflector))?;
        if !report.passed {
            return Err(QueryGateError::MalformedResponse { reason: report.failure_summary() });
        }

        serde_json::from_value(value).map_err(|e| QueryGateError::MalformedResponse {
            reason: format!("critique does not fit ScopeAssessment: {e}"),
        })
    }
}

/// Normalize harmless spelling differences before verification: aliased
/// keys, upper-case enum values, and a fractional complexity score.
fn canonicalize(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };

    for (alias, canonical) in KEY_ALIASES {
        if !map.contains_key(canonical) {
            if let Some(v) = map.remove(alias) {
                map.insert(canonical.to_string(), v);
            }
        }
    }

    lowercase(map, "risk");
    lowercase(map, "operation");

    // Out-of-range scores are left alone for the range rule to report.
    if let Some(score) = map.get("complexity").and_then(Value::as_f64) {
        let rounded = score.round();
        if (0.0..=f64::from(u8::MAX)).contains(&rounded) {
            map.insert("complexity".to_string(), json!(rounded as u64));
        }
    }
}

fn lowercase(map: &mut Map<String, Value>, key: &str) {
    if let Some(s) = map.get(key).and_then(Value::as_str) {
        let lowered = s.trim().to_lowercase();
        map.insert(key.to_string(), Value::String(lowered));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use querygate_contracts::{
        action::ActionKind,
        assessment::{OperationType, RiskLevel},
        caller::CallerContext,
        reasoning::Stage,
        run::{RunState, RunUpdate},
        step::Step,
    };

    use super::*;
    use crate::testing::*;

    fn state() -> RunState {
        RunState::new("Top customers by revenue", CallerContext::from_roles(["analyst"]), 5)
    }

    async fn assess(reasoning: &ScriptedReasoning, step: &Step) -> ScopeAssessment {
        let config = AgentConfig::default();
        let catalog = ActionCatalog::default();
        let reflector = Reflector::new(reasoning, &PassVerifier, &catalog, &config);
        match reflector.assess(&state(), step).await {
            RunUpdate::Assessed(a) => a,
            other => panic!("expected an assessment, got {other:?}"),
        }
    }

    // ── Shortcuts ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn introspection_is_not_critiqued() {
        let reasoning = ScriptedReasoning::new();
        let step = Step::new("look", ActionKind::new(ActionKind::GET_SCHEMA), Map::new());

        let a = assess(&reasoning, &step).await;

        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.operation, OperationType::Schema);
        assert_eq!(reasoning.calls(Stage::Reflector), 0);
    }

    // ── Degradation ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn unparsable_critique_yields_zero_confidence() {
        let reasoning = ScriptedReasoning::new().with_reply(Stage::Reflector, "I think it's fine!");

        let a = assess(&reasoning, &query_step("SELECT 1")).await;

        assert_eq!(a.confidence, 0.0);
        assert_eq!(a.risk, RiskLevel::High);
        assert!(a.destructive);
        assert!(a.issues[0].starts_with("critique unavailable"));
    }

    #[tokio::test]
    async fn port_failure_yields_zero_confidence() {
        let a = assess(&ScriptedReasoning::new(), &query_step("SELECT 1")).await;
        assert_eq!(a.confidence, 0.0);
    }

    // ── Overrides ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn satisfied_requirements_raise_confidence() {
        let reply = json!({
            "confidence": 0.7,
            "complexity": 3,
            "risk": "low",
            "operation": "read",
            "destructive": false,
            "requirements": [
                { "requirement": "groups by customer", "satisfied": true },
                { "requirement": "orders by revenue", "satisfied": true }
            ]
        });
        let reasoning = ScriptedReasoning::new().with_reply(Stage::Reflector, reply.to_string());

        let a = assess(&reasoning, &query_step("SELECT ...")).await;

        assert_eq!(a.confidence, REQUIREMENTS_MET_CONFIDENCE);
    }

    #[tokio::test]
    async fn unmet_requirement_keeps_raw_confidence() {
        let reply = json!({
            "confidence": 0.7,
            "complexity": 3,
            "risk": "low",
            "operation": "read",
            "destructive": false,
            "requirements": [
                { "requirement": "groups by customer", "satisfied": true },
                { "requirement": "orders by revenue", "satisfied": false }
            ]
        });
        let reasoning = ScriptedReasoning::new().with_reply(Stage::Reflector, reply.to_string());

        let a = assess(&reasoning, &query_step("SELECT ...")).await;

        assert_eq!(a.confidence, 0.7);
    }

    #[tokio::test]
    async fn aliased_critique_is_understood() {
        let reply = json!({
            "confidence_score": 0.97,
            "complexity_score": 2.2,
            "risk_level": "Medium",
            "operation_type": "READ",
            "is_destructive": false
        });
        let reasoning = ScriptedReasoning::new().with_reply(Stage::Reflector, reply.to_string());

        let a = assess(&reasoning, &query_step("SELECT ...")).await;

        assert_eq!(a.confidence, 0.97);
        assert_eq!(a.complexity, 2);
        assert_eq!(a.risk, RiskLevel::Medium);
        assert_eq!(a.operation, OperationType::Read);
    }

    // ── Canonicalization ─────────────────────────────────────────────────────

    #[test]
    fn canonicalize_maps_aliases_and_normalizes_values() {
        let mut value = json!({
            "confidence_score": 0.9,
            "complexity_score": 3.6,
            "risk_level": "LOW",
            "operation_type": " Read ",
            "is_destructive": false
        });
        canonicalize(&mut value);

        assert_eq!(value["confidence"], json!(0.9));
        assert_eq!(value["complexity"], json!(4));
        assert_eq!(value["risk"], json!("low"));
        assert_eq!(value["operation"], json!("read"));
        assert_eq!(value["destructive"], json!(false));
        assert!(value.get("risk_level").is_none());
    }

    #[test]
    fn canonical_keys_win_over_aliases() {
        let mut value = json!({ "confidence": 0.5, "confidence_score": 0.99 });
        canonicalize(&mut value);
        assert_eq!(value["confidence"], json!(0.5));
    }
}
