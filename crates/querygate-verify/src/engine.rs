//! Schema-based response verifier.
//!
//! `SchemaVerifier` implements the `ResponseVerifier` trait from
//! `querygate-core`. Verification runs in two phases:
//!
//! 1. **Structural**: the reply is validated against
//!    `ResponseSchema::json_schema` with the `jsonschema` crate.
//! 2. **Semantic**: each `VerificationRule` is evaluated in order.
//!
//! All failures are collected before returning, so a stage that logs the
//! report shows everything that was wrong with the reply at once.

use serde_json::Value;
use tracing::{debug, warn};

use querygate_contracts::{
    error::QueryGateResult,
    verify::{ResponseSchema, VerificationFailure, VerificationReport, VerificationRuleType},
};
use querygate_core::traits::ResponseVerifier;

#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaVerifier;

impl SchemaVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a dotted path (e.g. `"parameters.sql"`). Returns `None` when
    /// any segment is missing or the value is `null`.
    fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
        let mut current = value;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(v) if !v.is_null() => current = v,
                _ => return None,
            }
        }
        Some(current)
    }

    fn check(rule_type: &VerificationRuleType, response: &Value) -> Option<String> {
        match rule_type {
            VerificationRuleType::RequiredField { field_path } => {
                match Self::resolve_path(response, field_path) {
                    None => Some(format!("required field '{field_path}' is missing or null")),
                    Some(_) => None,
                }
            }

            VerificationRuleType::AllowedValues { field_path, allowed } => {
                match Self::resolve_path(response, field_path) {
                    Some(actual) if !allowed.contains(actual) => Some(format!(
                        "field '{field_path}' has value {actual} which is not in the allowed set"
                    )),
                    _ => None,
                }
            }

            VerificationRuleType::NumericRange { field_path, min, max } => {
                match Self::resolve_path(response, field_path) {
                    None => None,
                    Some(v) => match v.as_f64() {
                        Some(n) if n >= *min && n <= *max => None,
                        Some(n) => Some(format!(
                            "field '{field_path}' is {n}, outside [{min}, {max}]"
                        )),
                        None => Some(format!("field '{field_path}' is not a number")),
                    },
                }
            }
        }
    }
}

impl ResponseVerifier for SchemaVerifier {
    fn verify(&self, response: &Value, schema: &ResponseSchema) -> QueryGateResult<VerificationReport> {
        let mut failures: Vec<VerificationFailure> = Vec::new();

        // ── Phase 1: JSON Schema ─────────────────────────────────────────────
        if !schema.json_schema.is_null() {
            match jsonschema::validator_for(&schema.json_schema) {
                Ok(validator) => {
                    for error in validator.iter_errors(response) {
                        let message = format!("JSON Schema violation at {}: {}", error.instance_path, error);
                        warn!(schema_id = %schema.schema_id, %message, "structural validation failure");
                        failures.push(VerificationFailure { rule_id: "json-schema".to_string(), message });
                    }
                }
                Err(e) => {
                    let message = format!("invalid JSON Schema document: {e}");
                    warn!(schema_id = %schema.schema_id, %message, "schema compilation failure");
                    failures.push(VerificationFailure { rule_id: "json-schema".to_string(), message });
                }
            }
        }

        // ── Phase 2: semantic rules ──────────────────────────────────────────
        for rule in &schema.rules {
            if let Some(message) = Self::check(&rule.rule_type, response) {
                warn!(rule_id = %rule.rule_id, %message, "semantic rule failed");
                failures.push(VerificationFailure { rule_id: rule.rule_id.clone(), message });
            }
        }

        let passed = failures.is_empty();
        debug!(
            schema_id = %schema.schema_id,
            passed,
            failure_count = failures.len(),
            "verification complete"
        );
        Ok(VerificationReport { passed, failures })
    }
}
