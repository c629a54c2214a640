//! Response schemas and verification report types.
//!
//! Every structured reasoning response is checked against the schema of the
//! stage that asked for it before it is deserialized. A failing report is
//! handled exactly like unparsable JSON: the stage falls back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reasoning::Stage;

/// The full specification a reasoning response is checked against.
///
/// Combines a JSON Schema document (structure and types) with semantic
/// rules for constraints the stages care about individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Unique identifier for this schema (e.g. "reflector-v1").
    pub schema_id: String,
    /// JSON Schema document used for structural validation. `null` disables it.
    pub json_schema: Value,
    /// Additional rules evaluated after structural validation.
    pub rules: Vec<VerificationRule>,
}

/// A single semantic rule applied to a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRule {
    /// Unique identifier for this rule, referenced in failure reports.
    pub rule_id: String,
    pub description: String,
    pub rule_type: VerificationRuleType,
}

/// The kinds of semantic checks supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationRuleType {
    /// The field at `field_path` must be present and non-null.
    RequiredField {
        /// Dotted path, e.g. "parameters.sql".
        field_path: String,
    },

    /// The field at `field_path`, when present, must equal one of `allowed`.
    AllowedValues { field_path: String, allowed: Vec<Value> },

    /// The field at `field_path`, when present, must be a number in `[min, max]`.
    NumericRange { field_path: String, min: f64, max: f64 },
}

/// The result of checking one response against a `ResponseSchema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if every check passed.
    pub passed: bool,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// A single-line rendering of all failures.
    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A single failed check within a `VerificationReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub rule_id: String,
    pub message: String,
}

impl ResponseSchema {
    /// The built-in schema for responses to `stage`.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Planner => planner_schema(),
            Stage::Decider => decider_schema(),
            Stage::Reflector => reflector_schema(),
        }
    }
}

fn planner_schema() -> ResponseSchema {
    ResponseSchema {
        schema_id: "planner-v1".to_string(),
        json_schema: json!({
            "type": "object",
            "properties": {
                "entities": { "type": "array", "items": { "type": "string" } },
                "measure": { "type": ["string", "null"] },
                "operation": { "type": "string" },
                "constraint": { "type": ["string", "null"] },
                "interpretation": { "type": ["string", "null"] }
            }
        }),
        rules: vec![],
    }
}

fn decider_schema() -> ResponseSchema {
    ResponseSchema {
        schema_id: "decider-v1".to_string(),
        json_schema: json!({
            "type": "object",
            "required": ["action"],
            "properties": {
                "rationale": { "type": "string" },
                "action": { "type": "string", "minLength": 1 },
                "parameters": { "type": "object" },
                "summary": { "type": "string" },
                "status": { "type": "string" }
            }
        }),
        rules: vec![VerificationRule {
            rule_id: "completion-status".to_string(),
            description: "A completion may only claim success, partial or failed".to_string(),
            rule_type: VerificationRuleType::AllowedValues {
                field_path: "status".to_string(),
                allowed: vec![json!("success"), json!("partial"), json!("failed")],
            },
        }],
    }
}

fn reflector_schema() -> ResponseSchema {
    ResponseSchema {
        schema_id: "reflector-v1".to_string(),
        json_schema: json!({
            "type": "object",
            "required": ["confidence", "complexity", "risk", "operation", "destructive"],
            "properties": {
                "confidence": { "type": "number" },
                "complexity": { "type": "number" },
                "risk": { "type": "string" },
                "operation": { "type": "string" },
                "destructive": { "type": "boolean" },
                "issues": { "type": "array", "items": { "type": "string" } },
                "suggestions": { "type": "array", "items": { "type": "string" } },
                "intent_alignment": { "type": "string" },
                "requirements": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["requirement", "satisfied"],
                        "properties": {
                            "requirement": { "type": "string" },
                            "satisfied": { "type": "boolean" }
                        }
                    }
                }
            }
        }),
        rules: vec![
            VerificationRule {
                rule_id: "confidence-range".to_string(),
                description: "Confidence is a probability".to_string(),
                rule_type: VerificationRuleType::NumericRange {
                    field_path: "confidence".to_string(),
                    min: 0.0,
                    max: 1.0,
                },
            },
            VerificationRule {
                rule_id: "complexity-range".to_string(),
                description: "Complexity is scored from 1 to 10".to_string(),
                rule_type: VerificationRuleType::NumericRange {
                    field_path: "complexity".to_string(),
                    min: 1.0,
                    max: 10.0,
                },
            },
            VerificationRule {
                rule_id: "risk-level".to_string(),
                description: "Risk is low, medium or high".to_string(),
                rule_type: VerificationRuleType::AllowedValues {
                    field_path: "risk".to_string(),
                    allowed: vec![json!("low"), json!("medium"), json!("high")],
                },
            },
            VerificationRule {
                rule_id: "operation-type".to_string(),
                description: "Operation is read, write, ddl or schema".to_string(),
                rule_type: VerificationRuleType::AllowedValues {
                    field_path: "operation".to_string(),
                    allowed: vec![json!("read"), json!("write"), json!("ddl"), json!("schema")],
                },
            },
        ],
    }
}
