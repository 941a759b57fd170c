// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clio_config::AgentConfig;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are clio, a coding assistant running in the user's terminal. \
Use your tools to explore the codebase and make changes. Be concise in your responses.";

/// The system message that opens every session.
pub fn system_prompt(cfg: &AgentConfig) -> String {
    match cfg.system_prompt.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}
