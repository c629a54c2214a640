//! Prompt assembly for the three reasoning stages.
//!
//! The wording here is deliberately plain. What matters to the loop is
//! which context each stage receives: the bounded history window, the
//! binding failure of the previous step, and the mandatory replan feedback.

use serde_json::{json, Value};

use querygate_contracts::{
    action::ActionCatalog,
    reasoning::{Prompt, Stage},
    run::{PlannerOutput, Rejection, RunState},
    step::{Step, StepStatus},
};

/// Render the trailing `window` completed steps, truncating each result
/// payload to `row_cap` rows.
pub fn history_window(completed: &[Step], window: usize, row_cap: usize) -> Value {
    let start = completed.len().saturating_sub(window);
    Value::Array(completed[start..].iter().map(|s| render_step(s, row_cap)).collect())
}

fn render_step(step: &Step, row_cap: usize) -> Value {
    let mut entry = json!({
        "action": step.action.0,
        "parameters": step.parameters,
        "rationale": step.rationale,
        "status": step.status,
    });

    if let Some(result) = &step.result {
        let mut rendered = json!({ "success": result.success });
        if let Some(count) = result.row_count {
            rendered["row_count"] = json!(count);
        }
        if let Some(error) = &result.error {
            rendered["error"] = json!(error);
        }
        if let Some(data) = &result.data {
            let mut data = data.clone();
            // Row lists are either the payload itself or its `rows` field.
            let rows = match &mut data {
                Value::Array(rows) => Some(rows),
                Value::Object(map) => map.get_mut("rows").and_then(Value::as_array_mut),
                _ => None,
            };
            if let Some(rows) = rows.filter(|r| r.len() > row_cap) {
                let total = rows.len();
                rows.truncate(row_cap);
                rendered["note"] = json!(format!("truncated: showing {} of {} rows", row_cap, total));
            }
            rendered["data"] = data;
        }
        entry["result"] = rendered;
    }
    entry
}

pub fn planner_prompt(request: &str, catalog: &ActionCatalog) -> Prompt {
    Prompt {
        stage: Stage::Planner,
        system: "You analyse questions about a relational database. Classify the request and \
                 reply with one JSON object: {\"entities\": [string], \"measure\": string|null, \
                 \"operation\": \"lookup\"|\"aggregation\"|\"ranking\"|\"comparison\"|\"trend\"|\
                 \"schema\"|\"modification\"|\"standard\", \"constraint\": string|null, \
                 \"interpretation\": string|null}."
            .to_string(),
        user: json!({
            "request": request,
            "available_actions": catalog.describe(),
        })
        .to_string(),
    }
}

/// Everything the Decider is told on one attempt.
pub struct DeciderContext<'a> {
    pub state: &'a RunState,
    pub catalog: &'a ActionCatalog,
    pub window: usize,
    pub row_cap: usize,
    /// Why the previous attempt in this cycle was refused, if it was.
    pub correction: Option<&'a str>,
}

pub fn decider_prompt(ctx: &DeciderContext<'_>) -> Prompt {
    let state = ctx.state;
    let mut context = json!({
        "request": state.request,
        "plan": state.plan.as_ref().map(plan_json),
        "available_actions": ctx.catalog.describe(),
        "history": history_window(&state.completed, ctx.window, ctx.row_cap),
        "steps_used": state.step_count,
        "step_budget": state.max_steps,
    });

    if let Some(last) = state.last_completed().filter(|s| s.status == StepStatus::Failed) {
        context["previous_failure"] = json!({
            "instruction": "The previous step failed. Use its error to correct course. \
                            Do not repeat the same action with the same parameters.",
            "action": last.action.0,
            "parameters": last.parameters,
            "error": last.result.as_ref().and_then(|r| r.error.clone()),
        });
    }

    if let Some(rejection) = &state.rejection {
        context["rejected_proposal"] = rejection_json(rejection);
    }

    if let Some(correction) = ctx.correction {
        context["correction"] = json!(correction);
    }

    Prompt {
        stage: Stage::Decider,
        system: "You answer questions about a relational database one action at a time. \
                 Reply with one JSON object. To act: {\"rationale\": string, \"action\": \
                 string, \"parameters\": object}. When the request is answered: \
                 {\"action\": \"finish\", \"summary\": string, \"status\": \
                 \"success\"|\"partial\"|\"failed\"}."
            .to_string(),
        user: context.to_string(),
    }
}

pub fn reflector_prompt(
    state: &RunState,
    step: &Step,
    window: usize,
    row_cap: usize,
) -> Prompt {
    Prompt {
        stage: Stage::Reflector,
        system: "You critique one proposed database action before it runs. Judge correctness \
                 and intent alignment (confidence, 0..1) independently of cost (complexity, \
                 1..10). Reply with one JSON object: {\"confidence\": number, \"complexity\": \
                 number, \"risk\": \"low\"|\"medium\"|\"high\", \"operation\": \"read\"|\
                 \"write\"|\"ddl\"|\"schema\", \"destructive\": bool, \"issues\": [string], \
                 \"suggestions\": [string], \"intent_alignment\": string, \"requirements\": \
                 [{\"requirement\": string, \"satisfied\": bool}]}."
            .to_string(),
        user: json!({
            "request": state.request,
            "plan": state.plan.as_ref().map(plan_json),
            "proposed": {
                "rationale": step.rationale,
                "action": step.action.0,
                "parameters": step.parameters,
            },
            "history": history_window(&state.completed, window, row_cap),
        })
        .to_string(),
    }
}

fn plan_json(plan: &PlannerOutput) -> Value {
    serde_json::to_value(plan).unwrap_or(Value::Null)
}

fn rejection_json(rejection: &Rejection) -> Value {
    json!({
        "instruction": "This proposal was rejected by review. Address the issues and propose \
                        a materially different action; repeating it verbatim is not allowed.",
        "action": rejection.step.action.0,
        "parameters": rejection.step.parameters,
        "issues": rejection.feedback.issues,
        "suggestions": rejection.feedback.suggestions,
    })
}
