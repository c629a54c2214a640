//! Policy configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML. Every field has a default, so
//! an empty document yields the built-in policy:
//!
//! ```toml
//! confidence_threshold = 0.95
//! admin_role = "admin"
//! read_only_roles = ["readonly"]
//! exempt_actions = ["get_schema", "describe_table"]
//! query_parameter = "sql"
//! destructive_keywords = ["DROP", "DELETE", "TRUNCATE", "ALTER"]
//! write_keywords = ["INSERT", "UPDATE", "CREATE", "REPLACE", "MERGE", "GRANT", "REVOKE", "UPSERT"]
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// A step is approved only when its effective confidence is strictly
    /// greater than this value.
    pub confidence_threshold: f64,

    /// The role that may run destructive or high-risk steps.
    pub admin_role: String,

    /// Roles limited to read and schema operations.
    pub read_only_roles: Vec<String>,

    /// Action kinds approved without any check.
    pub exempt_actions: Vec<String>,

    /// Name of the step parameter holding the statement text for the
    /// keyword scan.
    pub query_parameter: String,

    /// Statement keywords that mark a step destructive when no assessment
    /// is available.
    pub destructive_keywords: Vec<String>,

    /// Statement keywords that mark a step as a write when no assessment
    /// is available.
    pub write_keywords: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            admin_role: "admin".to_string(),
            read_only_roles: vec!["readonly".to_string()],
            exempt_actions: vec!["get_schema".to_string(), "describe_table".to_string()],
            query_parameter: "sql".to_string(),
            destructive_keywords: ["DROP", "DELETE", "TRUNCATE", "ALTER"]
                .into_iter()
                .map(String::from)
                .collect(),
            write_keywords: ["INSERT", "UPDATE", "CREATE", "REPLACE", "MERGE", "GRANT", "REVOKE", "UPSERT"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl PolicyConfig {
    pub fn is_exempt(&self, action: &str) -> bool {
        self.exempt_actions.iter().any(|a| a == action)
    }
}
