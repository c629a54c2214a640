//! # querygate-contracts
//!
//! Shared types, schemas, and contracts for the QueryGate agent loop.
//!
//! All crates in the workspace import from here. The only logic in this
//! crate is the lifecycle bookkeeping of `Step` and `RunState`, which every
//! other crate relies on being enforced in exactly one place.

pub mod action;
pub mod assessment;
pub mod caller;
pub mod display;
pub mod error;
pub mod event;
pub mod policy;
pub mod reasoning;
pub mod run;
pub mod step;
pub mod verify;

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use action::{ActionCatalog, ActionKind};
    use assessment::{RequirementCheck, ScopeAssessment, REQUIREMENTS_MET_CONFIDENCE};
    use caller::{CallerContext, Role};
    use display::TabularData;
    use error::QueryGateError;
    use policy::{PolicyDecision, PolicyRoute, ReplanFeedback};
    use run::{Completion, RunState, RunStatus, RunSummary, RunUpdate, Termination};
    use step::{ExecutionResult, Step, StepStatus};

    fn query_step(sql: &str) -> Step {
        let mut params = Map::new();
        params.insert("sql".to_string(), json!(sql));
        Step::new("look it up", ActionKind::new(ActionKind::EXECUTE_QUERY), params)
    }

    fn run(max_steps: usize) -> RunState {
        RunState::new("how many orders?", CallerContext::from_roles(["readonly"]), max_steps)
    }

    // ── CallerContext ────────────────────────────────────────────────────────

    #[test]
    fn caller_context_grant_and_has() {
        let mut caller = CallerContext::default();
        let admin = Role::new("admin");

        assert!(!caller.has(&admin));
        caller.grant(admin.clone());
        assert!(caller.has(&admin));
        assert!(caller.has_named("admin"));
        assert!(!caller.has_named("readonly"));
    }

    #[test]
    fn caller_context_duplicate_grant_is_idempotent() {
        let caller = CallerContext::from_roles(["readonly", "readonly"]);
        assert_eq!(caller.all().count(), 1);
    }

    // ── Step lifecycle ───────────────────────────────────────────────────────

    #[test]
    fn step_advances_forward_only() {
        let mut step = query_step("SELECT 1");
        step.advance(StepStatus::Approved).unwrap();
        step.advance(StepStatus::Completed).unwrap();

        match step.advance(StepStatus::Pending) {
            Err(QueryGateError::StateMachine { reason }) => {
                assert!(reason.contains("completed"), "unexpected reason: {reason}");
            }
            other => panic!("expected StateMachine error, got {:?}", other),
        }
    }

    #[test]
    fn denied_step_cannot_be_reapproved() {
        let mut step = query_step("SELECT 1");
        step.advance(StepStatus::Denied).unwrap();
        assert!(step.status.is_terminal());
        assert!(step.advance(StepStatus::Approved).is_err());
    }

    #[test]
    fn pending_step_cannot_skip_approval() {
        let mut step = query_step("SELECT 1");
        assert!(step.advance(StepStatus::Completed).is_err());
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[test]
    fn same_proposal_compares_action_and_parameters() {
        let a = query_step("SELECT * FROM orders");
        let b = query_step("SELECT * FROM orders");
        let c = query_step("SELECT id FROM orders");

        assert!(a.same_proposal(&b), "different ids, same proposal");
        assert!(!a.same_proposal(&c));
    }

    #[test]
    fn execution_result_with_error_is_failure() {
        assert!(ExecutionResult::failure("no such table").is_failure());
        assert!(!ExecutionResult::rows(json!([]), 0).is_failure());
    }

    // ── ScopeAssessment ──────────────────────────────────────────────────────

    #[test]
    fn requirements_met_raises_effective_confidence() {
        let mut assessment = ScopeAssessment::unparseable("x");
        assessment.confidence = 0.4;
        assessment.requirements = vec![
            RequirementCheck { requirement: "groups by region".into(), satisfied: true },
            RequirementCheck { requirement: "filters 2024".into(), satisfied: true },
        ];
        assert!(assessment.effective_confidence() >= REQUIREMENTS_MET_CONFIDENCE);

        assessment.requirements[1].satisfied = false;
        assert_eq!(assessment.effective_confidence(), 0.4);
    }

    #[test]
    fn empty_checklist_does_not_trigger_override() {
        let mut assessment = ScopeAssessment::introspection();
        assessment.confidence = 0.5;
        assert!(!assessment.all_requirements_met());
        assert_eq!(assessment.effective_confidence(), 0.5);
    }

    #[test]
    fn unparseable_assessment_rejects() {
        let assessment = ScopeAssessment::unparseable("bad json");
        assert_eq!(assessment.confidence, 0.0);
        assert!(assessment.destructive);
        assert!(assessment.issues[0].contains("bad json"));
    }

    // ── RunState::apply ──────────────────────────────────────────────────────

    #[test]
    fn proposal_past_budget_is_a_fault() {
        let mut state = run(1);
        state.apply(RunUpdate::Proposed(query_step("SELECT 1"))).unwrap();
        state.apply(RunUpdate::Decided(PolicyDecision::allow("ok"))).unwrap();

        let mut done = state.current.clone().unwrap();
        done.advance(StepStatus::Completed).unwrap();
        state.apply(RunUpdate::Executed(done)).unwrap();

        assert!(state.budget_exhausted());
        let err = state.apply(RunUpdate::Proposed(query_step("SELECT 2"))).unwrap_err();
        assert!(err.to_string().contains("step budget"));
        assert_eq!(state.completed.len(), 1);
    }

    #[test]
    fn second_in_flight_step_is_a_fault() {
        let mut state = run(5);
        state.apply(RunUpdate::Proposed(query_step("SELECT 1"))).unwrap();
        assert!(state.apply(RunUpdate::Proposed(query_step("SELECT 2"))).is_err());
    }

    #[test]
    fn confidence_denial_discards_step_and_records_rejection() {
        let mut state = run(5);
        state.apply(RunUpdate::Proposed(query_step("SELECT * FROM a, b"))).unwrap();
        let feedback = ReplanFeedback {
            issues: vec!["cartesian product".into()],
            suggestions: vec!["add a join condition".into()],
        };
        let decision = PolicyDecision::confidence_denied("confidence 0.80", feedback.clone());
        assert_eq!(decision.route(), PolicyRoute::Replan);
        state.apply(RunUpdate::Decided(decision)).unwrap();

        assert!(state.current.is_none());
        assert!(state.termination.is_none());
        assert_eq!(state.discarded.len(), 1);
        assert_eq!(state.discarded[0].status, StepStatus::Denied);
        let rejection = state.rejection.as_ref().unwrap();
        assert_eq!(rejection.feedback, feedback);

        // The next proposal consumes the rejection.
        state.apply(RunUpdate::Proposed(query_step("SELECT * FROM a JOIN b ON a.id = b.a_id"))).unwrap();
        assert!(state.rejection.is_none());
        assert_eq!(state.step_count, 2);
    }

    #[test]
    fn authorization_denial_terminates_as_blocked() {
        let mut state = run(5);
        state.apply(RunUpdate::Proposed(query_step("DROP TABLE orders"))).unwrap();
        let decision = PolicyDecision::deny("requires role 'admin'");
        assert_eq!(decision.route(), PolicyRoute::Halt);
        state.apply(RunUpdate::Decided(decision)).unwrap();

        assert_eq!(
            state.termination,
            Some(Termination::Blocked { reason: "requires role 'admin'".into() })
        );
        assert!(state.apply(RunUpdate::Proposed(query_step("SELECT 1"))).is_err());
    }

    #[test]
    fn executing_an_unapproved_step_is_a_fault() {
        let mut state = run(5);
        let step = query_step("SELECT 1");
        state.apply(RunUpdate::Proposed(step.clone())).unwrap();

        let mut forged = step;
        forged.status = StepStatus::Completed;
        assert!(state.apply(RunUpdate::Executed(forged)).is_err());
    }

    #[test]
    fn completion_is_recorded_once() {
        let mut state = run(5);
        state
            .apply(RunUpdate::Completion(Completion {
                status: RunStatus::Success,
                summary: "done".into(),
            }))
            .unwrap();
        state
            .apply(RunUpdate::Completion(Completion {
                status: RunStatus::Failed,
                summary: "again".into(),
            }))
            .unwrap();

        assert_eq!(
            state.termination,
            Some(Termination::Finished { status: RunStatus::Success, summary: "done".into() })
        );
    }

    #[test]
    fn finalized_summary_is_not_overwritten() {
        let mut state = run(5);
        let first = RunSummary {
            explanation: "first".into(),
            actions: vec![],
            status: RunStatus::Success,
            data: None,
        };
        let second = RunSummary { explanation: "second".into(), ..first.clone() };

        state.apply(RunUpdate::Finalized(first.clone())).unwrap();
        state.apply(RunUpdate::Finalized(second)).unwrap();
        assert_eq!(state.summary, Some(first));
    }

    // ── TabularData ──────────────────────────────────────────────────────────

    #[test]
    fn normalize_array_of_objects_fills_missing_cells() {
        let data = json!([{ "id": 1, "name": "ada" }, { "id": 2 }]);
        let table = TabularData::normalize(&data).unwrap();

        assert_eq!(table.columns, vec!["id", "name"]);
        assert_eq!(table.rows[1], vec![json!(2), Value::Null]);
    }

    #[test]
    fn normalize_schema_mapping() {
        let data = json!({ "customers": ["id", "name"], "orders": ["id", "total"] });
        let table = TabularData::normalize(&data).unwrap();

        assert_eq!(table.columns, vec!["table", "columns"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][0], json!("customers"));
    }

    #[test]
    fn normalize_column_table_keeps_column_order() {
        let data = json!({ "columns": ["name", "id"], "rows": [["ada", 1], ["grace"]] });
        let table = TabularData::normalize(&data).unwrap();

        assert_eq!(table.columns, vec!["name", "id"]);
        assert_eq!(table.rows[1], vec![json!("grace"), Value::Null]);
    }

    #[test]
    fn normalize_empty_column_table_keeps_header() {
        let data = json!({ "columns": ["name", "id"], "rows": [] });
        let table = TabularData::normalize(&data).unwrap();

        assert_eq!(table.columns, vec!["name", "id"]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn normalize_scalar_and_null() {
        let table = TabularData::normalize(&json!(42)).unwrap();
        assert_eq!(table.columns, vec!["value"]);
        assert_eq!(table.rows, vec![vec![json!(42)]]);
        assert!(TabularData::normalize(&Value::Null).is_none());
    }

    // ── ActionCatalog ────────────────────────────────────────────────────────

    #[test]
    fn default_catalog_marks_introspection_actions() {
        let catalog = ActionCatalog::default();
        assert!(catalog.is_introspection(&ActionKind::new(ActionKind::GET_SCHEMA)));
        assert!(catalog.is_introspection(&ActionKind::new(ActionKind::DESCRIBE_TABLE)));
        assert!(!catalog.is_introspection(&ActionKind::new(ActionKind::EXECUTE_QUERY)));
        assert!(!catalog.is_introspection(&ActionKind::new("launch_missiles")));
        assert_eq!(catalog.describe().as_array().unwrap().len(), 3);
    }

    // ── QueryGateError display messages ──────────────────────────────────────

    #[test]
    fn error_state_machine_display() {
        let err = QueryGateError::StateMachine { reason: "illegal transition".to_string() };
        let msg = err.to_string();
        assert!(msg.contains("state machine error"));
        assert!(msg.contains("illegal transition"));
    }

    #[test]
    fn error_malformed_response_display() {
        let err = QueryGateError::MalformedResponse { reason: "expected object".to_string() };
        assert!(err.to_string().contains("malformed reasoning response"));
    }
}
