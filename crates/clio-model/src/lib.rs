// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod provider;
mod openai_compat;
mod mock;

pub use types::*;
pub use provider::ModelProvider;
pub use openai_compat::OpenAICompatProvider;
pub use mock::{MockProvider, ScriptedMockProvider};

use std::sync::Arc;

use anyhow::{bail, Context};
use clio_config::ModelConfig;

/// Construct a shared [`ModelProvider`] from configuration.
///
/// Provider selection:
/// - `"openai"` / `"openrouter"` → [`OpenAICompatProvider`] against `base_url`
/// - `"mock"` → [`MockProvider`] (echo-back, no network)
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    match cfg.provider.as_str() {
        "openai" | "openrouter" => {
            let key = cfg
                .resolve_api_key()
                .context("API key not set; provide api_key or api_key_env in config")?;
            Ok(Arc::new(OpenAICompatProvider::new(
                "openai",
                cfg.name.clone(),
                Some(key),
                &cfg.base_url,
                cfg.max_tokens,
                cfg.temperature,
            )))
        }
        "mock" => Ok(Arc::new(MockProvider)),
        other => bail!("unknown model provider: {other}"),
    }
}
