//! Loop configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! [agent]
//! max_steps = 10
//! history_window = 5
//! history_row_cap = 10
//! decider_retries = 1
//! reflection_enabled = true
//! default_roles = ["readonly"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use querygate_contracts::error::{QueryGateError, QueryGateResult};

/// Tunables for one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Step budget used when a request does not carry its own.
    pub max_steps: usize,
    /// How many trailing completed steps the Decider and Reflector see.
    pub history_window: usize,
    /// Rows of each result payload kept in that window.
    pub history_row_cap: usize,
    /// Extra Decider attempts after an unusable reply.
    pub decider_retries: usize,
    /// When false, steps reach the Policy Gate without an assessment.
    pub reflection_enabled: bool,
    /// Roles assumed when a request carries no caller context.
    pub default_roles: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            history_window: 5,
            history_row_cap: 10,
            decider_retries: 1,
            reflection_enabled: true,
            default_roles: vec!["readonly".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    agent: AgentConfig,
}

impl AgentConfig {
    /// Parse the `[agent]` table of a TOML document.
    ///
    /// Returns `QueryGateError::Config` for malformed TOML or a zero step
    /// budget.
    pub fn from_toml_str(s: &str) -> QueryGateResult<Self> {
        let file: ConfigFile = toml::from_str(s).map_err(|e| QueryGateError::Config {
            reason: format!("failed to parse agent config TOML: {}", e),
        })?;
        file.agent.validated()
    }

    /// Read and parse the TOML file at `path`.
    pub fn from_file(path: &Path) -> QueryGateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QueryGateError::Config {
            reason: format!("failed to read agent config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validated(self) -> QueryGateResult<Self> {
        if self.max_steps == 0 {
            return Err(QueryGateError::Config {
                reason: "max_steps must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::AgentConfig;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn partial_agent_table_overrides_only_given_fields() {
        let config = AgentConfig::from_toml_str(
            r#"
            [agent]
            max_steps = 3
            reflection_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_steps, 3);
        assert!(!config.reflection_enabled);
        assert_eq!(config.history_window, 5);
        assert_eq!(config.default_roles, vec!["readonly"]);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = AgentConfig::from_toml_str("[agent]\nmax_steps = 0").unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = AgentConfig::from_toml_str("[agent\nmax_steps = ").unwrap_err();
        assert!(err.to_string().contains("failed to parse agent config TOML"));
    }
}
