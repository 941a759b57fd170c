// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use clio_model::ToolCall;

/// Why a tool call did not succeed.
///
/// The model only ever sees `ToolOutput::content`; each kind writes its own
/// recognisable prefix into that text so the model can tell a bad argument
/// from a failed command and retry accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// No handler is registered under the requested name.
    UnknownTool,
    /// The argument JSON was malformed or missed a required field.
    InvalidArguments,
    /// The action itself failed (I/O error, non-zero exit).
    Execution,
    /// The action was cancelled after running too long.
    Timeout,
}

/// The result of executing a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub call_id: String,
    /// Text fed back to the model as the outcome of the call.
    pub content: String,
    /// `None` on success.
    pub error: Option<ToolErrorKind>,
}

impl ToolOutput {
    /// Successful plain-text result.
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), error: None }
    }

    /// Failed result; `msg` is still delivered to the model.
    pub fn err(call_id: impl Into<String>, kind: ToolErrorKind, msg: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: msg.into(), error: Some(kind) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A capability that can be invoked by name.  Every outcome, including
/// failure, comes back as a [`ToolOutput`]; nothing escapes as an error.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Must match the `name` of the definition the handler is registered for.
    fn name(&self) -> &str;

    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

/// Decode the call's JSON arguments into `T`.
///
/// An empty argument string is read as `{}` so the resulting message names
/// the missing field rather than complaining about end of input.
pub fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolOutput> {
    let raw = if call.arguments.trim().is_empty() { "{}" } else { call.arguments.as_str() };
    serde_json::from_str(raw).map_err(|e| {
        ToolOutput::err(
            &call.id,
            ToolErrorKind::InvalidArguments,
            format!("error parsing arguments: {e}"),
        )
    })
}
