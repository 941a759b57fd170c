// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

/// Display events emitted by the agent, in the order they should be shown.
/// Consumers (headless printer, TUI) render these; none of them feed back
/// into the model-facing transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// The user's submitted text
    UserEcho(String),
    /// Text produced by the model (possibly empty)
    AssistantText(String),
    /// The model has requested a tool call
    ToolCallAnnounced { name: String, arguments: String },
    /// A tool call finished
    ToolCallFinished {
        call_id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    /// The turn failed or was cut short; display only
    ErrorAnnounced(String),
    /// Token usage reported for one model call
    Usage { input: u32, output: u32 },
    /// The agent is idle again and will accept input
    TurnComplete,
}
