// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The turn state machine.
//!
//! [`Session`] performs no I/O.  Each input returns a [`Transition`]: the
//! display events to show and, at most, one [`Effect`] for the driver to
//! start.  The driver reports the effect's outcome back as the next input.
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use clio_model::{CompletionResponse, Message, ToolCall};
use clio_tools::{ToolErrorKind, ToolOutput};

use crate::conversation::Conversation;
use crate::events::AgentEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingModel,
    AwaitingTools,
}

/// How a successful model reply continues the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Final(String),
    PendingTools(Vec<ToolCall>),
}

impl TurnOutcome {
    pub fn of(reply: &CompletionResponse) -> Self {
        if reply.tool_calls.is_empty() {
            Self::Final(reply.text.clone())
        } else {
            Self::PendingTools(reply.tool_calls.clone())
        }
    }
}

/// Asynchronous work the driver must start.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call the model with this frozen transcript.
    CallModel(Vec<Message>),
    /// Execute these calls; report results through `on_tool_results`.
    RunTools(Vec<ToolCall>),
}

#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub events: Vec<AgentEvent>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }
}

pub struct Session {
    id: String,
    transcript: Conversation,
    state: TurnState,
    /// Calls whose results are awaited, in the order the model issued them.
    in_flight: Vec<ToolCall>,
    /// Tool rounds completed in the current user turn.
    rounds: u32,
    /// 0 means unlimited.
    max_rounds: u32,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, max_rounds: u32) -> Self {
        let mut transcript = Conversation::new();
        // An empty transcript always accepts a system message.
        let _ = transcript.append(Message::system(system_prompt));
        let id = uuid::Uuid::new_v4().to_string();
        debug!(session = %id, "session created");
        Self {
            id,
            transcript,
            state: TurnState::Idle,
            in_flight: Vec::new(),
            rounds: 0,
            max_rounds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// True from submission until the turn ends.
    pub fn is_waiting(&self) -> bool {
        self.state != TurnState::Idle
    }

    pub fn transcript(&self) -> &Conversation {
        &self.transcript
    }

    /// Start a turn.  Blank input, or any input while a turn is in flight,
    /// changes nothing.
    pub fn submit(&mut self, text: &str) -> Transition {
        let text = text.trim();
        if text.is_empty() {
            return Transition::none();
        }
        if self.is_waiting() {
            debug!(state = ?self.state, "input ignored while a turn is in flight");
            return Transition::none();
        }
        if let Err(e) = self.transcript.append(Message::user(text)) {
            warn!(error = %e, "user message rejected");
            return Transition {
                events: vec![AgentEvent::ErrorAnnounced(e.to_string())],
                effect: None,
            };
        }
        info!(session = %self.id, "turn started");
        self.rounds = 0;
        self.state = TurnState::AwaitingModel;
        Transition {
            events: vec![AgentEvent::UserEcho(text.to_string())],
            effect: Some(Effect::CallModel(self.transcript.snapshot())),
        }
    }

    /// Feed the outcome of the model call started by the last transition.
    pub fn on_model_reply(&mut self, reply: Result<CompletionResponse, String>) -> Transition {
        if self.state != TurnState::AwaitingModel {
            warn!(state = ?self.state, "model reply arrived with no call in flight");
            return Transition::none();
        }

        let mut reply = match reply {
            Ok(r) => r,
            Err(msg) => {
                warn!(error = %msg, "model call failed");
                return self.end_turn(vec![AgentEvent::ErrorAnnounced(msg)]);
            }
        };

        let mut events = Vec::new();
        if let Some(u) = reply.usage {
            events.push(AgentEvent::Usage { input: u.input_tokens, output: u.output_tokens });
        }
        normalize_call_ids(&mut reply.tool_calls);

        match TurnOutcome::of(&reply) {
            TurnOutcome::Final(text) => {
                if let Err(e) = self.transcript.append(Message::assistant(text.clone())) {
                    events.push(AgentEvent::ErrorAnnounced(e.to_string()));
                    return self.end_turn(events);
                }
                events.push(AgentEvent::AssistantText(text));
                self.end_turn(events)
            }
            TurnOutcome::PendingTools(calls) => {
                let message = Message::assistant_with_tools(reply.text.clone(), calls.clone());
                if let Err(e) = self.transcript.append(message) {
                    events.push(AgentEvent::ErrorAnnounced(e.to_string()));
                    return self.end_turn(events);
                }
                if !reply.text.is_empty() {
                    events.push(AgentEvent::AssistantText(reply.text));
                }
                events.extend(calls.iter().map(|c| AgentEvent::ToolCallAnnounced {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                }));
                debug!(count = calls.len(), "dispatching tool calls");
                self.state = TurnState::AwaitingTools;
                self.in_flight = calls.clone();
                Transition { events, effect: Some(Effect::RunTools(calls)) }
            }
        }
    }

    /// Feed the results of the tool calls started by the last transition.
    ///
    /// Results may arrive in any order; they are written to the transcript in
    /// call order.  A call without a result gets a synthesized error so that
    /// every call is answered.
    pub fn on_tool_results(&mut self, results: Vec<ToolOutput>) -> Transition {
        if self.state != TurnState::AwaitingTools {
            warn!(state = ?self.state, "tool results arrived with no tools in flight");
            return Transition::none();
        }

        let mut by_id: HashMap<String, ToolOutput> =
            results.into_iter().map(|r| (r.call_id.clone(), r)).collect();
        let calls = std::mem::take(&mut self.in_flight);
        let mut events = Vec::with_capacity(calls.len() + 2);

        for call in &calls {
            let output = by_id.remove(&call.id).unwrap_or_else(|| {
                ToolOutput::err(
                    &call.id,
                    ToolErrorKind::Execution,
                    "error: tool produced no result",
                )
            });
            if let Err(e) = self.transcript.append(Message::tool_result(&call.id, &output.content)) {
                // Unreachable while `in_flight` mirrors the last assistant message.
                warn!(error = %e, "tool result rejected");
                events.push(AgentEvent::ErrorAnnounced(e.to_string()));
                return self.end_turn(events);
            }
            events.push(AgentEvent::ToolCallFinished {
                call_id: call.id.clone(),
                name: call.name.clone(),
                is_error: output.is_error(),
                output: output.content,
            });
        }
        if !by_id.is_empty() {
            warn!(extra = by_id.len(), "discarding results for unknown call ids");
        }

        self.rounds += 1;
        if self.max_rounds > 0 && self.rounds >= self.max_rounds {
            warn!(rounds = self.rounds, "tool round limit reached");
            events.push(AgentEvent::ErrorAnnounced(format!(
                "stopped after {} tool rounds without a final answer",
                self.rounds
            )));
            return self.end_turn(events);
        }

        self.state = TurnState::AwaitingModel;
        Transition { events, effect: Some(Effect::CallModel(self.transcript.snapshot())) }
    }

    fn end_turn(&mut self, mut events: Vec<AgentEvent>) -> Transition {
        self.state = TurnState::Idle;
        self.in_flight.clear();
        info!(session = %self.id, rounds = self.rounds, "turn complete");
        events.push(AgentEvent::TurnComplete);
        Transition { events, effect: None }
    }
}

/// Give every call a unique, non-empty id so results can be matched.
/// Models occasionally omit ids or repeat them within one reply.
fn normalize_call_ids(calls: &mut [ToolCall]) {
    let mut seen = HashSet::new();
    for (i, call) in calls.iter_mut().enumerate() {
        if call.id.is_empty() || !seen.insert(call.id.clone()) {
            let mut n = i;
            let mut id = format!("call_{n}");
            while seen.contains(&id) {
                n += 1;
                id = format!("call_{n}");
            }
            seen.insert(id.clone());
            call.id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clio_model::Usage;

    fn session() -> Session {
        Session::new("sys", 50)
    }

    fn bash(id: &str, cmd: &str) -> ToolCall {
        ToolCall::new(id, "Bash", format!(r#"{{"command":"{cmd}"}}"#))
    }

    // ── Submission ────────────────────────────────────────────────────────────

    #[test]
    fn submit_starts_model_call_with_snapshot() {
        let mut s = session();
        let t = s.submit("  hello  ");
        assert_eq!(t.events, vec![AgentEvent::UserEcho("hello".into())]);
        match t.effect {
            Some(Effect::CallModel(msgs)) => {
                assert_eq!(msgs, vec![Message::system("sys"), Message::user("hello")]);
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(s.state(), TurnState::AwaitingModel);
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut s = session();
        assert_eq!(s.submit("   \n"), Transition::default());
        assert_eq!(s.state(), TurnState::Idle);
        assert_eq!(s.transcript().len(), 1);
    }

    #[test]
    fn submit_while_waiting_is_a_no_op() {
        let mut s = session();
        s.submit("first");
        let before = s.transcript().len();
        assert_eq!(s.submit("second"), Transition::default());
        assert_eq!(s.transcript().len(), before);

        s.on_model_reply(Ok(CompletionResponse::tools("", vec![bash("a", "ls")])));
        assert_eq!(s.state(), TurnState::AwaitingTools);
        assert_eq!(s.submit("third"), Transition::default());
        assert_eq!(s.transcript().len(), before + 1);
    }

    // ── Model replies ─────────────────────────────────────────────────────────

    #[test]
    fn final_reply_returns_to_idle() {
        let mut s = session();
        s.submit("hi");
        let t = s.on_model_reply(Ok(CompletionResponse::text("hello there")));
        assert_eq!(
            t.events,
            vec![AgentEvent::AssistantText("hello there".into()), AgentEvent::TurnComplete]
        );
        assert!(t.effect.is_none());
        assert_eq!(s.state(), TurnState::Idle);
        assert_eq!(s.transcript().messages().last(), Some(&Message::assistant("hello there")));
    }

    #[test]
    fn empty_reply_is_final_not_error() {
        let mut s = session();
        s.submit("hi");
        let t = s.on_model_reply(Ok(CompletionResponse::default()));
        assert_eq!(t.events, vec![AgentEvent::AssistantText(String::new()), AgentEvent::TurnComplete]);
        assert_eq!(s.transcript().messages().last(), Some(&Message::assistant("")));
    }

    #[test]
    fn model_error_is_display_only() {
        let mut s = session();
        s.submit("hi");
        let len = s.transcript().len();
        let t = s.on_model_reply(Err("connection refused".into()));
        assert_eq!(
            t.events,
            vec![AgentEvent::ErrorAnnounced("connection refused".into()), AgentEvent::TurnComplete]
        );
        assert_eq!(s.transcript().len(), len);
        assert_eq!(s.state(), TurnState::Idle);
        // The session accepts the next turn.
        assert!(s.submit("again").effect.is_some());
    }

    #[test]
    fn usage_is_reported_first() {
        let mut s = session();
        s.submit("hi");
        let reply = CompletionResponse {
            text: "ok".into(),
            tool_calls: vec![],
            usage: Some(Usage { input_tokens: 7, output_tokens: 2 }),
        };
        let t = s.on_model_reply(Ok(reply));
        assert_eq!(t.events[0], AgentEvent::Usage { input: 7, output: 2 });
    }

    #[test]
    fn tool_calls_are_announced_and_dispatched() {
        let mut s = session();
        s.submit("list");
        let calls = vec![bash("a", "ls"), bash("b", "pwd")];
        let t = s.on_model_reply(Ok(CompletionResponse::tools("checking", calls.clone())));
        assert_eq!(
            t.events,
            vec![
                AgentEvent::AssistantText("checking".into()),
                AgentEvent::ToolCallAnnounced { name: "Bash".into(), arguments: r#"{"command":"ls"}"#.into() },
                AgentEvent::ToolCallAnnounced { name: "Bash".into(), arguments: r#"{"command":"pwd"}"#.into() },
            ]
        );
        assert_eq!(t.effect, Some(Effect::RunTools(calls)));
        assert!(s.transcript().awaiting_results());
    }

    #[test]
    fn stale_reply_is_ignored() {
        let mut s = session();
        assert_eq!(s.on_model_reply(Ok(CompletionResponse::text("?"))), Transition::default());
        assert_eq!(s.on_tool_results(vec![]), Transition::default());
        assert_eq!(s.transcript().len(), 1);
    }

    // ── Tool results ──────────────────────────────────────────────────────────

    #[test]
    fn results_are_written_in_call_order() {
        let mut s = session();
        s.submit("go");
        s.on_model_reply(Ok(CompletionResponse::tools(
            "",
            vec![bash("a", "1"), bash("b", "2"), bash("c", "3")],
        )));
        let t = s.on_tool_results(vec![
            ToolOutput::ok("c", "three"),
            ToolOutput::ok("a", "one"),
            ToolOutput::ok("b", "two"),
        ]);

        let tail: Vec<&Message> = s.transcript().messages().iter().rev().take(3).rev().collect();
        assert_eq!(
            tail,
            vec![
                &Message::tool_result("a", "one"),
                &Message::tool_result("b", "two"),
                &Message::tool_result("c", "three"),
            ]
        );
        match t.effect {
            Some(Effect::CallModel(msgs)) => assert_eq!(msgs.len(), s.transcript().len()),
            other => panic!("expected a follow-up model call, got {other:?}"),
        }
        assert_eq!(s.state(), TurnState::AwaitingModel);
    }

    #[test]
    fn missing_result_is_synthesized() {
        let mut s = session();
        s.submit("go");
        s.on_model_reply(Ok(CompletionResponse::tools("", vec![bash("a", "1"), bash("b", "2")])));
        let t = s.on_tool_results(vec![ToolOutput::ok("a", "one")]);
        assert!(matches!(
            &t.events[1],
            AgentEvent::ToolCallFinished { call_id, is_error: true, .. } if call_id == "b"
        ));
        assert!(!s.transcript().awaiting_results());
    }

    #[test]
    fn round_limit_stops_the_turn() {
        let mut s = Session::new("sys", 1);
        s.submit("loop forever");
        s.on_model_reply(Ok(CompletionResponse::tools("", vec![bash("a", "true")])));
        let t = s.on_tool_results(vec![ToolOutput::ok("a", "")]);
        assert!(t.effect.is_none());
        assert!(matches!(t.events.last(), Some(AgentEvent::TurnComplete)));
        assert!(t.events.iter().any(|e| matches!(e, AgentEvent::ErrorAnnounced(m) if m.contains("1 tool rounds"))));
        assert_eq!(s.state(), TurnState::Idle);
        assert!(!s.transcript().awaiting_results());
    }

    // ── Call ids ──────────────────────────────────────────────────────────────

    #[test]
    fn missing_and_duplicate_ids_are_replaced() {
        let mut calls = vec![bash("", "a"), bash("x", "b"), bash("x", "c"), bash("call_0", "d")];
        normalize_call_ids(&mut calls);
        let ids: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(calls.iter().all(|c| !c.id.is_empty()));
        assert_eq!(calls[1].id, "x");
    }
}
