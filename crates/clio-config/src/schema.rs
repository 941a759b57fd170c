// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint used when neither the config nor `OPENROUTER_BASE_URL` name one.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Model requested when neither the config nor `CLIO_MODEL` name one.
pub const DEFAULT_MODEL: &str = "anthropic/claude-haiku-4.5";
/// Environment variable consulted for the API key by default.
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub tui: TuiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier: "openai" (any OpenAI-compatible endpoint) or "mock"
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Root of the chat-completions API, without the `/chat/completions` suffix
    pub base_url: String,
    /// Environment variable that holds the API key (read at runtime)
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    pub api_key: Option<String>,
    /// Maximum tokens to request in a single completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key_env: Some(DEFAULT_API_KEY_ENV.into()),
            api_key: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl ModelConfig {
    /// Resolve the API key: an explicit `api_key` wins over `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|k| std::env::var(k).ok())
    }

    pub(crate) fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        self.api_key_env
            .as_deref()
            .and_then(lookup)
            .filter(|k| !k.is_empty())
    }

    pub fn is_mock(&self) -> bool {
        self.provider == "mock"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Replaces the built-in assistant persona when set
    pub system_prompt: Option<String>,
    /// Upper bound on automatic model calls within one user turn (0 = unlimited)
    pub max_tool_rounds: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { system_prompt: None, max_tool_rounds: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Wall-clock limit for a single `Bash` invocation
    pub bash_timeout_secs: u64,
    /// How many tool calls from one model reply may run at the same time
    pub max_parallel: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { bash_timeout_secs: 30, max_parallel: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Draw with plain ASCII glyphs instead of Unicode symbols
    pub ascii: bool,
    /// Spinner refresh interval in milliseconds
    pub tick_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { ascii: false, tick_ms: 100 }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key: set {env} or model.api_key")]
    MissingApiKey { env: String },
    #[error("model.base_url is empty")]
    EmptyBaseUrl,
    #[error("model.name is empty")]
    EmptyModelName,
    #[error("unknown model provider {0:?} (expected \"openai\" or \"mock\")")]
    UnknownProvider(String),
    #[error("tools.bash_timeout_secs must be greater than zero")]
    ZeroBashTimeout,
}

impl Config {
    /// Check the settings the loop cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(|k| std::env::var(k).ok())
    }

    pub(crate) fn validate_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        match self.model.provider.as_str() {
            "mock" => {}
            "openai" | "openrouter" => {
                if self.model.base_url.trim().is_empty() {
                    return Err(ConfigError::EmptyBaseUrl);
                }
                if self.model.resolve_api_key_with(&lookup).is_none() {
                    let env = self
                        .model
                        .api_key_env
                        .clone()
                        .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
                    return Err(ConfigError::MissingApiKey { env });
                }
            }
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::EmptyModelName);
        }
        if self.tools.bash_timeout_secs == 0 {
            return Err(ConfigError::ZeroBashTimeout);
        }
        Ok(())
    }

    /// Copy suitable for printing: the explicit key is masked.
    pub fn redacted(&self) -> Config {
        let mut cfg = self.clone();
        if cfg.model.api_key.is_some() {
            cfg.model.api_key = Some("***".into());
        }
        cfg
    }
}
