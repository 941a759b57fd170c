// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use clio_model::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("expected the result of tool call {expected}, got {found}")]
    OutOfOrderResult { expected: String, found: String },
    #[error("tool result {0} does not answer an outstanding call")]
    OrphanResult(String),
    #[error("{0} tool call(s) are still waiting for results")]
    ResultsOutstanding(usize),
    #[error("tool call id {0:?} appears twice in one assistant message")]
    DuplicateCallId(String),
}

/// Append-only transcript that is sent to the model on every call.
///
/// After an assistant message carrying N tool calls, exactly N tool results
/// must follow, one per call and in call order, before anything else may be
/// appended.  A rejected append leaves the transcript untouched.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Ids of tool calls whose results have not been appended yet, in order.
    pending: VecDeque<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) -> Result<(), TranscriptError> {
        match &message {
            Message::Tool { tool_call_id, .. } => match self.pending.front() {
                Some(expected) if expected == tool_call_id => {
                    self.pending.pop_front();
                }
                Some(expected) => {
                    return Err(TranscriptError::OutOfOrderResult {
                        expected: expected.clone(),
                        found: tool_call_id.clone(),
                    })
                }
                None => return Err(TranscriptError::OrphanResult(tool_call_id.clone())),
            },
            other => {
                if !self.pending.is_empty() {
                    return Err(TranscriptError::ResultsOutstanding(self.pending.len()));
                }
                let calls = other.tool_calls();
                let mut seen = HashSet::new();
                for call in calls {
                    if !seen.insert(call.id.as_str()) {
                        return Err(TranscriptError::DuplicateCallId(call.id.clone()));
                    }
                }
                self.pending = calls.iter().map(|c| c.id.clone()).collect();
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// Owned copy handed to the model call; later appends do not affect it.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True while an assistant message's tool calls lack results.
    pub fn awaiting_results(&self) -> bool {
        !self.pending.is_empty()
    }
}
