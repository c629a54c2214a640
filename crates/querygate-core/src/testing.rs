//! Hand-rolled test doubles shared by the stage and orchestrator tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use querygate_contracts::{
    action::ActionKind,
    assessment::OperationType,
    caller::CallerContext,
    error::{QueryGateError, QueryGateResult},
    event::StepEvent,
    policy::{PolicyDecision, ReplanFeedback},
    reasoning::{CompletionOptions, Prompt, Stage},
    run::RunId,
    step::{ExecutionResult, Step},
    verify::{ResponseSchema, VerificationReport},
};

use crate::traits::{DatabasePort, EventSink, PolicyGate, ReasoningPort, ResponseVerifier};

// ── Reasoning ────────────────────────────────────────────────────────────────

/// Replays canned replies per stage. An exhausted script is a port error.
#[derive(Default)]
pub struct ScriptedReasoning {
    replies: Mutex<HashMap<Stage, VecDeque<String>>>,
    pub prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, stage: Stage, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(text.into());
        self
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.prompts.lock().unwrap().iter().filter(|p| p.stage == stage).count()
    }
}

#[async_trait]
impl ReasoningPort for ScriptedReasoning {
    async fn complete(&self, prompt: &Prompt, _options: CompletionOptions) -> QueryGateResult<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .get_mut(&prompt.stage)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| QueryGateError::Reasoning {
                reason: format!("no scripted reply left for {:?}", prompt.stage),
            })
    }
}

// ── Database ─────────────────────────────────────────────────────────────────

/// Returns canned results keyed by SQL text and records every statement.
pub struct MockDatabase {
    pub schema: BTreeMap<String, Vec<String>>,
    results: HashMap<String, ExecutionResult>,
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        let mut schema = BTreeMap::new();
        schema.insert(
            "customers".to_string(),
            vec!["id".to_string(), "name".to_string(), "region".to_string()],
        );
        schema.insert(
            "orders".to_string(),
            vec!["id".to_string(), "customer_id".to_string(), "total".to_string()],
        );
        Self { schema, results: HashMap::new(), executed: Arc::new(Mutex::new(vec![])) }
    }

    pub fn with_result(mut self, sql: &str, result: ExecutionResult) -> Self {
        self.results.insert(sql.to_string(), result);
        self
    }
}

#[async_trait]
impl DatabasePort for MockDatabase {
    async fn execute(&self, sql: &str, _params: &[Value]) -> QueryGateResult<ExecutionResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self
            .results
            .get(sql)
            .cloned()
            .unwrap_or_else(|| ExecutionResult::rows(json!([]), 0)))
    }

    async fn get_schema(&self) -> QueryGateResult<BTreeMap<String, Vec<String>>> {
        Ok(self.schema.clone())
    }
}

// ── Verifier ─────────────────────────────────────────────────────────────────

/// Accepts every object; rejects anything else.
pub struct PassVerifier;

impl ResponseVerifier for PassVerifier {
    fn verify(&self, response: &Value, _schema: &ResponseSchema) -> QueryGateResult<VerificationReport> {
        Ok(VerificationReport { passed: response.is_object(), failures: vec![] })
    }
}

// ── Policy ───────────────────────────────────────────────────────────────────

/// A minimal threshold gate: introspection passes, low confidence replans,
/// non-read operations need "admin".
pub struct MockGate {
    pub threshold: f64,
    pub evaluated: Arc<Mutex<u32>>,
}

impl MockGate {
    pub fn new() -> Self {
        Self { threshold: 0.95, evaluated: Arc::new(Mutex::new(0)) }
    }
}

impl PolicyGate for MockGate {
    fn evaluate(&self, step: &Step, caller: &CallerContext) -> QueryGateResult<PolicyDecision> {
        *self.evaluated.lock().unwrap() += 1;
        if step.action.as_str() != ActionKind::EXECUTE_QUERY {
            return Ok(PolicyDecision::allow("exempt"));
        }
        let Some(assessment) = &step.assessment else {
            return Ok(PolicyDecision::allow("no assessment"));
        };
        if assessment.effective_confidence() <= self.threshold {
            return Ok(PolicyDecision::confidence_denied(
                "low confidence",
                ReplanFeedback {
                    issues: assessment.issues.clone(),
                    suggestions: assessment.suggestions.clone(),
                },
            ));
        }
        if (assessment.destructive || assessment.operation != OperationType::Read)
            && !caller.has_named("admin")
        {
            return Ok(PolicyDecision::deny("requires role 'admin'"));
        }
        Ok(PolicyDecision::allow("approved"))
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<StepEvent>>>,
    pub finalized: Arc<Mutex<Vec<RunId>>>,
    pub fail: bool,
}

impl EventSink for RecordingSink {
    fn record(&self, event: &StepEvent) -> QueryGateResult<()> {
        if self.fail {
            return Err(QueryGateError::TraceWrite { reason: "sink offline".to_string() });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn finalize(&self, run_id: &RunId) -> QueryGateResult<()> {
        self.finalized.lock().unwrap().push(*run_id);
        Ok(())
    }
}

// ── Reply builders ───────────────────────────────────────────────────────────

pub fn plan_reply() -> String {
    json!({ "entities": ["customers"], "operation": "lookup" }).to_string()
}

pub fn query_reply(sql: &str) -> String {
    json!({
        "rationale": "query the data",
        "action": "execute_query",
        "parameters": { "sql": sql }
    })
    .to_string()
}

pub fn action_reply(action: &str, parameters: Value) -> String {
    json!({ "rationale": "next step", "action": action, "parameters": parameters }).to_string()
}

pub fn finish_reply(status: &str, summary: &str) -> String {
    json!({ "rationale": "done", "action": "finish", "status": status, "summary": summary })
        .to_string()
}

pub fn critique_reply(confidence: f64, operation: &str, destructive: bool, issues: &[&str]) -> String {
    json!({
        "confidence": confidence,
        "complexity": 2,
        "risk": if destructive { "high" } else { "low" },
        "operation": operation,
        "destructive": destructive,
        "issues": issues,
        "suggestions": issues.iter().map(|i| format!("fix: {i}")).collect::<Vec<_>>(),
        "intent_alignment": "matches the request"
    })
    .to_string()
}

pub fn query_step(sql: &str) -> Step {
    let mut params = Map::new();
    params.insert("sql".to_string(), json!(sql));
    Step::new("query", ActionKind::new(ActionKind::EXECUTE_QUERY), params)
}
