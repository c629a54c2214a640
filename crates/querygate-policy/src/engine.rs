//! Threshold policy gate implementation.
//!
//! `ThresholdPolicyGate` loads a `PolicyConfig` from a TOML string or file
//! and implements the `PolicyGate` trait from querygate-core.
//!
//! Evaluation algorithm:
//!
//! 1. Exempt action kinds → `Allowed`.
//! 2. If the step carries an assessment and its effective confidence is at
//!    or below the threshold → `ConfidenceDenied` with the critique's issues
//!    and suggestions (the orchestrator replans).
//! 3. Authorization, from the assessment or, absent one, a keyword scan of
//!    the statement text:
//!    a. Destructive or high-risk without the admin role → `Denied` for a
//!       read-only caller, `RequiresApproval` otherwise.
//!    b. A read-only caller attempting anything but read/schema → `Denied`.
//! 4. Otherwise → `Allowed`.

use std::path::Path;

use tracing::{debug, warn};

use querygate_contracts::{
    assessment::{OperationType, RiskLevel},
    caller::CallerContext,
    error::{QueryGateError, QueryGateResult},
    policy::{PolicyDecision, ReplanFeedback},
    step::Step,
};
use querygate_core::traits::PolicyGate;

use crate::{keywords::find_keyword, rule::PolicyConfig};

/// The facts authorization is decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OperationFacts {
    operation: OperationType,
    destructive: bool,
    risk: RiskLevel,
}

/// A `PolicyGate` driven by a confidence threshold and caller roles.
///
/// ```rust,ignore
/// use querygate_policy::ThresholdPolicyGate;
///
/// let gate = ThresholdPolicyGate::from_file(Path::new("policies/default.toml"))?;
/// ```
#[derive(Debug, Default)]
pub struct ThresholdPolicyGate {
    config: PolicyConfig,
}

impl ThresholdPolicyGate {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Parse `s` as TOML and build a `ThresholdPolicyGate`.
    ///
    /// Returns `QueryGateError::Config` if the TOML is malformed or the
    /// threshold lies outside [0, 1].
    pub fn from_toml_str(s: &str) -> QueryGateResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| QueryGateError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(QueryGateError::Config {
                reason: format!(
                    "confidence_threshold must be within [0, 1], got {}",
                    config.confidence_threshold
                ),
            });
        }
        Ok(Self { config })
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> QueryGateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QueryGateError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    fn facts(&self, step: &Step) -> OperationFacts {
        if let Some(a) = &step.assessment {
            return OperationFacts { operation: a.operation, destructive: a.destructive, risk: a.risk };
        }

        let text = step.text_parameter(&self.config.query_parameter).unwrap_or_default();
        if let Some(keyword) = find_keyword(text, &self.config.destructive_keywords) {
            debug!(step_id = %step.id, keyword, "destructive keyword in unassessed step");
            return OperationFacts {
                operation: OperationType::Write,
                destructive: true,
                risk: RiskLevel::High,
            };
        }
        if let Some(keyword) = find_keyword(text, &self.config.write_keywords) {
            debug!(step_id = %step.id, keyword, "write keyword in unassessed step");
            return OperationFacts {
                operation: OperationType::Write,
                destructive: false,
                risk: RiskLevel::Medium,
            };
        }
        OperationFacts { operation: OperationType::Read, destructive: false, risk: RiskLevel::Low }
    }

    /// A caller is read-only unless it holds the admin role. A caller with
    /// no roles at all is treated as read-only.
    fn is_read_only(&self, caller: &CallerContext) -> bool {
        if caller.has_named(&self.config.admin_role) {
            return false;
        }
        caller.all().next().is_none()
            || self.config.read_only_roles.iter().any(|r| caller.has_named(r))
    }
}

impl PolicyGate for ThresholdPolicyGate {
    fn evaluate(&self, step: &Step, caller: &CallerContext) -> QueryGateResult<PolicyDecision> {
        debug!(step_id = %step.id, action = %step.action, "evaluating policy");

        if self.config.is_exempt(step.action.as_str()) {
            return Ok(PolicyDecision::allow(format!(
                "'{}' is exempt from review",
                step.action
            )));
        }

        if let Some(assessment) = &step.assessment {
            let confidence = assessment.effective_confidence();
            if confidence <= self.config.confidence_threshold {
                debug!(
                    step_id = %step.id,
                    confidence,
                    threshold = self.config.confidence_threshold,
                    "confidence at or below threshold"
                );
                return Ok(PolicyDecision::confidence_denied(
                    format!(
                        "confidence {:.2} does not exceed the threshold {:.2}",
                        confidence, self.config.confidence_threshold
                    ),
                    ReplanFeedback {
                        issues: assessment.issues.clone(),
                        suggestions: assessment.suggestions.clone(),
                    },
                ));
            }
        }

        let facts = self.facts(step);
        let admin = &self.config.admin_role;
        let is_admin = caller.has_named(admin);
        let read_only = self.is_read_only(caller);

        if (facts.destructive || facts.risk == RiskLevel::High) && !is_admin {
            warn!(step_id = %step.id, action = %step.action, read_only, "destructive step without admin role");
            let reason = format!("destructive or high-risk operation requires role '{admin}'");
            return Ok(if read_only {
                PolicyDecision::deny(reason)
            } else {
                PolicyDecision::require_approval(reason)
            });
        }

        if read_only && !facts.operation.is_read_only() {
            warn!(step_id = %step.id, operation = ?facts.operation, "write attempted by read-only caller");
            return Ok(PolicyDecision::deny(format!(
                "read-only caller may not perform {} operations; requires role '{admin}'",
                facts.operation
            )));
        }

        Ok(PolicyDecision::allow("approved"))
    }
}
