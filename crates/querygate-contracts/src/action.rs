//! The action catalog: every kind of data-access action the loop may take.
//!
//! The Decider may name any action kind it likes; the catalog is what it is
//! told about, what the Reflector consults for its introspection shortcut,
//! and what the Executor knows how to dispatch. An action kind missing from
//! the catalog simply fails at execution time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assessment::OperationType;

/// Name of an action kind, e.g. `"execute_query"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKind(pub String);

impl ActionKind {
    /// Run a SQL statement through the database port.
    pub const EXECUTE_QUERY: &'static str = "execute_query";
    /// Fetch the table → columns mapping.
    pub const GET_SCHEMA: &'static str = "get_schema";
    /// Fetch the columns of a single table.
    pub const DESCRIBE_TABLE: &'static str = "describe_table";
    /// Pseudo-action the Decider uses to declare completion. Never executed.
    pub const FINISH: &'static str = "finish";

    /// Construct an action kind from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the completion pseudo-action.
    pub fn is_finish(&self) -> bool {
        self.0 == Self::FINISH
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static description of one action kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// The action kind this entry describes.
    pub kind: ActionKind,
    /// One-line description shown to the reasoning layer.
    pub description: String,
    /// JSON Schema of the parameter mapping.
    pub parameters: Value,
    /// The kind of database operation this action performs at most.
    ///
    /// `execute_query` is `Write` here because it can run anything; the
    /// Reflector narrows it per step.
    pub operation: OperationType,
    /// Pure metadata actions. They cannot satisfy or violate user intent on
    /// their own, so the Reflector does not critique them.
    pub introspection: bool,
}

/// Read-only registry of the available action kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCatalog {
    specs: Vec<ActionSpec>,
}

impl ActionCatalog {
    /// Build a catalog from explicit specs.
    pub fn new(specs: Vec<ActionSpec>) -> Self {
        Self { specs }
    }

    /// Look up an action kind.
    pub fn get(&self, kind: &ActionKind) -> Option<&ActionSpec> {
        self.specs.iter().find(|s| &s.kind == kind)
    }

    /// True if `kind` is a known introspection action.
    pub fn is_introspection(&self, kind: &ActionKind) -> bool {
        self.get(kind).map(|s| s.introspection).unwrap_or(false)
    }

    pub fn specs(&self) -> &[ActionSpec] {
        &self.specs
    }

    /// Render the catalog as the JSON array handed to the reasoning layer.
    pub fn describe(&self) -> Value {
        Value::Array(
            self.specs
                .iter()
                .map(|s| {
                    json!({
                        "action": s.kind.0,
                        "description": s.description,
                        "parameters": s.parameters,
                    })
                })
                .collect(),
        )
    }
}

impl Default for ActionCatalog {
    /// The built-in catalog: schema fetch, single-table describe, and query.
    fn default() -> Self {
        Self::new(vec![
            ActionSpec {
                kind: ActionKind::new(ActionKind::GET_SCHEMA),
                description: "List every table and its columns".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
                operation: OperationType::Schema,
                introspection: true,
            },
            ActionSpec {
                kind: ActionKind::new(ActionKind::DESCRIBE_TABLE),
                description: "List the columns of one table".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": { "table": { "type": "string" } },
                    "required": ["table"]
                }),
                operation: OperationType::Schema,
                introspection: true,
            },
            ActionSpec {
                kind: ActionKind::new(ActionKind::EXECUTE_QUERY),
                description: "Run one SQL statement and return its rows".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sql": { "type": "string" },
                        "params": { "type": "array" }
                    },
                    "required": ["sql"]
                }),
                operation: OperationType::Write,
                introspection: false,
            },
        ])
    }
}
