//! `ReasoningPort` adapters.
//!
//! - `HttpReasoningClient` talks to any OpenAI-compatible
//!   `/chat/completions` endpoint (OpenAI, Ollama, vLLM, LM Studio, ...).
//! - `ScriptedReasoning` replays canned replies per stage and drives the
//!   deterministic demo scenarios.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use querygate_contracts::{
    error::{QueryGateError, QueryGateResult},
    reasoning::{CompletionOptions, Prompt, Stage},
};
use querygate_core::traits::ReasoningPort;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Connection settings for `HttpReasoningClient`, read from the
/// `[reasoning]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Base URL up to and including the API version, e.g.
    /// `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the bearer token. Unset means no auth.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: "QUERYGATE_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    reasoning: ReasoningConfig,
}

impl ReasoningConfig {
    /// Parse the `[reasoning]` table of a TOML document.
    pub fn from_toml_str(s: &str) -> QueryGateResult<Self> {
        let file: ConfigFile = toml::from_str(s).map_err(|e| QueryGateError::Config {
            reason: format!("failed to parse reasoning config TOML: {}", e),
        })?;
        Ok(file.reasoning)
    }

    pub fn from_file(path: &Path) -> QueryGateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QueryGateError::Config {
            reason: format!("failed to read reasoning config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

// ── HTTP client ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct HttpReasoningClient {
    client: reqwest::Client,
    config: ReasoningConfig,
    api_key: Option<String>,
}

impl HttpReasoningClient {
    /// Build a client. The request timeout comes from `config.timeout_secs`.
    pub fn new(config: ReasoningConfig) -> QueryGateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QueryGateError::Config {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            debug!(env = %config.api_key_env, "no API key set, sending unauthenticated requests");
        }
        Ok(Self { client, config, api_key })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReasoningPort for HttpReasoningClient {
    async fn complete(&self, prompt: &Prompt, options: CompletionOptions) -> QueryGateResult<String> {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user }
            ],
            "temperature": self.config.temperature
        });
        if options.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(stage = ?prompt.stage, model = %self.config.model, "sending completion request");
        let response = request.send().await.map_err(|e| QueryGateError::Reasoning {
            reason: format!("request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(stage = ?prompt.stage, %status, "completion endpoint returned an error");
            return Err(QueryGateError::Reasoning { reason: format!("API error {}: {}", status, text) });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| QueryGateError::MalformedResponse {
            reason: format!("unexpected completion payload: {}", e),
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| QueryGateError::MalformedResponse {
                reason: "completion returned no content".to_string(),
            })
    }
}

// ── Scripted replies ──────────────────────────────────────────────────────────

/// Replays canned replies, one queue per stage.
///
/// A stage whose queue is empty gets a `Reasoning` error, which every stage
/// already treats as a degraded reply.
#[derive(Debug, Default)]
pub struct ScriptedReasoning {
    replies: Mutex<HashMap<Stage, VecDeque<String>>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` as the next reply for `stage`.
    pub fn with_reply(self, stage: Stage, text: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(stage).or_default().push_back(text.into());
        }
        self
    }

    /// Replies not yet consumed, across all stages.
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .map(|r| r.values().map(VecDeque::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReasoningPort for ScriptedReasoning {
    async fn complete(&self, prompt: &Prompt, _options: CompletionOptions) -> QueryGateResult<String> {
        let mut replies = self.replies.lock().map_err(|e| QueryGateError::Reasoning {
            reason: format!("script lock poisoned: {}", e),
        })?;
        replies
            .get_mut(&prompt.stage)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| QueryGateError::Reasoning {
                reason: format!("no scripted reply left for {:?}", prompt.stage),
            })
    }
}

#[cfg(test)]
mod tests {
    use querygate_contracts::reasoning::{CompletionOptions, Prompt, Stage};
    use querygate_core::traits::ReasoningPort;

    use super::{ReasoningConfig, ScriptedReasoning};

    fn prompt(stage: Stage) -> Prompt {
        Prompt { stage, system: String::new(), user: String::new() }
    }

    #[test]
    fn reasoning_config_reads_its_table() {
        let toml = r#"
            [agent]
            max_steps = 4

            [reasoning]
            base_url = "https://api.openai.com/v1"
            model = "gpt-4o-mini"
            timeout_secs = 20
        "#;
        let config = ReasoningConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.api_key_env, "QUERYGATE_API_KEY");
    }

    #[tokio::test]
    async fn script_replays_per_stage_in_order() {
        let script = ScriptedReasoning::new()
            .with_reply(Stage::Decider, "first")
            .with_reply(Stage::Planner, "plan")
            .with_reply(Stage::Decider, "second");

        let opts = CompletionOptions::json();
        assert_eq!(script.complete(&prompt(Stage::Decider), opts).await.unwrap(), "first");
        assert_eq!(script.complete(&prompt(Stage::Decider), opts).await.unwrap(), "second");
        assert_eq!(script.remaining(), 1);
        assert!(script.complete(&prompt(Stage::Reflector), opts).await.is_err());
    }
}
