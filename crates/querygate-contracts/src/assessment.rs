//! The Scope Reflector's critique of a proposed step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidence granted when every entry of a requirements checklist is
/// satisfied, regardless of the raw score the critique reported.
pub const REQUIREMENTS_MET_CONFIDENCE: f64 = 0.96;

/// Coarse risk bucket assigned by the Reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// What kind of database operation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Write,
    Ddl,
    Schema,
}

impl OperationType {
    /// Read and schema operations never change data.
    pub fn is_read_only(self) -> bool {
        matches!(self, OperationType::Read | OperationType::Schema)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationType::Read => "read",
            OperationType::Write => "write",
            OperationType::Ddl => "ddl",
            OperationType::Schema => "schema",
        };
        f.write_str(s)
    }
}

/// One entry of the critique's structured checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub requirement: String,
    pub satisfied: bool,
}

/// Reflector output for a single step.
///
/// `confidence` (is the action correct and intent-aligned?) and `complexity`
/// (how expensive is it?) are independent axes: a correct but heavy query
/// keeps its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeAssessment {
    /// Estimated probability the action is correct, in [0, 1].
    pub confidence: f64,
    /// Estimated cost, in [1, 10].
    pub complexity: u8,
    pub risk: RiskLevel,
    pub operation: OperationType,
    pub destructive: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub intent_alignment: String,
    #[serde(default)]
    pub requirements: Vec<RequirementCheck>,
}

impl ScopeAssessment {
    /// The fixed assessment for pure metadata actions.
    pub fn introspection() -> Self {
        Self {
            confidence: 1.0,
            complexity: 1,
            risk: RiskLevel::Low,
            operation: OperationType::Schema,
            destructive: false,
            issues: vec![],
            suggestions: vec![],
            intent_alignment: "metadata lookup; does not answer the request on its own"
                .to_string(),
            requirements: vec![],
        }
    }

    /// The assessment synthesized when a critique cannot be obtained or parsed.
    ///
    /// Maximal risk and zero confidence: an unreadable critique rejects.
    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self {
            confidence: 0.0,
            complexity: 10,
            risk: RiskLevel::High,
            operation: OperationType::Write,
            destructive: true,
            issues: vec![format!("critique unavailable: {}", reason.into())],
            suggestions: vec![],
            intent_alignment: String::new(),
            requirements: vec![],
        }
    }

    /// True when the checklist is non-empty and every entry is satisfied.
    pub fn all_requirements_met(&self) -> bool {
        !self.requirements.is_empty() && self.requirements.iter().all(|r| r.satisfied)
    }

    /// The confidence the Policy Gate compares against its threshold.
    pub fn effective_confidence(&self) -> f64 {
        if self.all_requirements_met() {
            self.confidence.max(REQUIREMENTS_MET_CONFIDENCE)
        } else {
            self.confidence
        }
    }
}
