// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use clio_config::{AgentConfig, ToolsConfig};
use clio_model::{CompletionRequest, CompletionResponse, ModelProvider, ToolDefinition};
use clio_tools::{ToolOutput, ToolRegistry};

use crate::events::AgentEvent;
use crate::prompts::system_prompt;
use crate::session::{Effect, Session, Transition, TurnState};

/// Completion reports from background work, delivered through the agent's
/// single inbound channel.
#[derive(Debug)]
pub enum LoopEvent {
    /// The model call finished; errors are already rendered to text.
    ModelReplied(Result<CompletionResponse, String>),
    /// Every tool call of the current round finished.
    ToolsFinished(Vec<ToolOutput>),
}

/// Drives a [`Session`] by running its effects as tokio tasks.
///
/// The session is only touched from the task that owns the `Agent`; model
/// and tool tasks report back through [`LoopEvent`]s which the owner feeds
/// to [`Agent::handle`].
pub struct Agent {
    session: Session,
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    /// Advertised on every request; the registry is fixed after startup.
    tool_definitions: Vec<ToolDefinition>,
    max_parallel: usize,
    tx: mpsc::Sender<LoopEvent>,
    rx: mpsc::Receiver<LoopEvent>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        agent_cfg: &AgentConfig,
        tools_cfg: &ToolsConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(16);
        Self {
            session: Session::new(system_prompt(agent_cfg), agent_cfg.max_tool_rounds),
            tool_definitions: tools.list(),
            model,
            tools,
            max_parallel: tools_cfg.max_parallel.max(1),
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn is_waiting(&self) -> bool {
        self.session.is_waiting()
    }

    pub fn state(&self) -> TurnState {
        self.session.state()
    }

    /// Submit user input.  Ignored (no events) while a turn is in flight.
    pub fn submit(&mut self, text: &str) -> Vec<AgentEvent> {
        let t = self.session.submit(text);
        self.apply(t)
    }

    /// Apply a completion report to the session.
    pub fn handle(&mut self, event: LoopEvent) -> Vec<AgentEvent> {
        let t = match event {
            LoopEvent::ModelReplied(reply) => self.session.on_model_reply(reply),
            LoopEvent::ToolsFinished(results) => self.session.on_tool_results(results),
        };
        self.apply(t)
    }

    /// Wait for the next completion report.  Pending forever while idle,
    /// which makes it safe to poll inside `tokio::select!`.
    pub async fn next_event(&mut self) -> LoopEvent {
        match self.rx.recv().await {
            Some(ev) => ev,
            // The agent holds a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    /// Run one full user turn to completion, forwarding display events.
    pub async fn run_turn(&mut self, text: &str, tx: &mpsc::Sender<AgentEvent>) {
        let mut pending = self.submit(text);
        loop {
            for ev in pending.drain(..) {
                let _ = tx.send(ev).await;
            }
            if !self.is_waiting() {
                break;
            }
            let ev = self.next_event().await;
            pending = self.handle(ev);
        }
    }

    fn apply(&mut self, t: Transition) -> Vec<AgentEvent> {
        if let Some(effect) = t.effect {
            self.dispatch(effect);
        }
        t.events
    }

    fn dispatch(&self, effect: Effect) {
        let tx = self.tx.clone();
        match effect {
            Effect::CallModel(messages) => {
                let model = Arc::clone(&self.model);
                let req = CompletionRequest { messages, tools: self.tool_definitions.clone() };
                debug!(messages = req.messages.len(), "starting model call");
                tokio::spawn(async move {
                    let reply = model.complete(req).await.map_err(|e| format!("{e:#}"));
                    let _ = tx.send(LoopEvent::ModelReplied(reply)).await;
                });
            }
            Effect::RunTools(calls) => {
                let tools = Arc::clone(&self.tools);
                let max_parallel = self.max_parallel;
                debug!(calls = calls.len(), max_parallel, "starting tool round");
                tokio::spawn(async move {
                    let results = tools.execute_batch(calls, max_parallel).await;
                    let _ = tx.send(LoopEvent::ToolsFinished(results)).await;
                });
            }
        }
    }
}
