// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Integration tests wiring config, model, tools and the agent loop together
/// without a network or terminal.
use std::sync::Arc;

use async_trait::async_trait;
use clio_config::{Config, ConfigError};
use clio_core::{Agent, AgentEvent, TurnState};
use clio_model::{CompletionResponse, Message, ModelProvider, ScriptedMockProvider, ToolCall, ToolDefinition};
use clio_tools::{Tool, ToolOutput, ToolRegistry};
use tokio::sync::mpsc;

async fn run_turn(agent: &mut Agent, text: &str) -> Vec<AgentEvent> {
    let (tx, mut rx) = mpsc::channel(256);
    agent.run_turn(text, &tx).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

// ── Config → provider → agent ────────────────────────────────────────────────

#[tokio::test]
async fn mock_config_runs_a_turn() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[model]\nprovider = \"mock\"\n");

    let config = clio_config::load(Some(&path)).unwrap();
    config.validate().unwrap();

    let model = clio_model::from_config(&config.model).unwrap();
    let tools = Arc::new(ToolRegistry::builtin(&config.tools).unwrap());
    let mut agent = Agent::new(model, tools, &config.agent, &config.tools);

    let events = run_turn(&mut agent, "hello").await;
    assert_eq!(events.first(), Some(&AgentEvent::UserEcho("hello".into())));
    assert!(events.iter().any(|e| matches!(e, AgentEvent::AssistantText(t) if t.contains("MOCK"))));
    assert_eq!(events.last(), Some(&AgentEvent::TurnComplete));
    assert_eq!(agent.state(), TurnState::Idle);
}

#[test]
fn missing_api_key_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "[model]\nprovider = \"openai\"\napi_key_env = \"CLIO_IT_DEFINITELY_UNSET_KEY\"\n",
    );
    let config = clio_config::load(Some(&path)).unwrap();
    match config.validate() {
        Err(ConfigError::MissingApiKey { env }) => assert_eq!(env, "CLIO_IT_DEFINITELY_UNSET_KEY"),
        other => panic!("expected missing key error, got {other:?}"),
    }
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[model\nprovider = ");
    assert!(clio_config::load(Some(&path)).is_err());
}

#[test]
fn default_config_uses_openrouter() {
    let config = Config::default();
    assert_eq!(config.model.provider, "openai");
    assert!(config.model.base_url.contains("openrouter"));
    assert_eq!(config.agent.max_tool_rounds, 50);
}

// ── Custom tools ─────────────────────────────────────────────────────────────

struct Shout;

#[async_trait]
impl Tool for Shout {
    fn name(&self) -> &str {
        "Shout"
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        ToolOutput::ok(&call.id, call.arguments.to_uppercase())
    }
}

#[tokio::test]
async fn registered_tool_is_advertised_and_executed() {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDefinition {
                name: "Shout".into(),
                description: "Upper-cases its input".into(),
                parameters: serde_json::json!({ "type": "object", "properties": {} }),
            },
            Arc::new(Shout),
        )
        .unwrap();

    let model = Arc::new(ScriptedMockProvider::new(vec![
        CompletionResponse::tools("shouting", vec![ToolCall::new("s1", "Shout", "quiet")]),
        CompletionResponse::text("done"),
    ]));
    let cfg = Config::default();
    let mut agent = Agent::new(
        Arc::clone(&model) as Arc<dyn ModelProvider>,
        Arc::new(registry),
        &cfg.agent,
        &cfg.tools,
    );

    let events = run_turn(&mut agent, "be loud").await;
    assert_eq!(
        events,
        vec![
            AgentEvent::UserEcho("be loud".into()),
            AgentEvent::AssistantText("shouting".into()),
            AgentEvent::ToolCallAnnounced { name: "Shout".into(), arguments: "quiet".into() },
            AgentEvent::ToolCallFinished {
                call_id: "s1".into(),
                name: "Shout".into(),
                output: "QUIET".into(),
                is_error: false,
            },
            AgentEvent::AssistantText("done".into()),
            AgentEvent::TurnComplete,
        ]
    );

    let req = model.last_request().unwrap();
    assert_eq!(req.tools.len(), 1);
    assert!(matches!(
        req.messages.last(),
        Some(Message::Tool { tool_call_id, content }) if tool_call_id == "s1" && content == "QUIET"
    ));
}

// ── Built-in tools end to end ────────────────────────────────────────────────

#[tokio::test]
async fn bash_creates_file_that_read_returns() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("note.txt");
    let cmd = format!("printf 'from bash' > {}", file.display());

    let model = Arc::new(ScriptedMockProvider::new(vec![
        CompletionResponse::tools("", vec![ToolCall::new("b", "Bash", serde_json::json!({ "command": cmd }).to_string())]),
        CompletionResponse::tools("", vec![ToolCall::new("r", "Read", serde_json::json!({ "file_path": file }).to_string())]),
        CompletionResponse::text("the note says: from bash"),
    ]));
    let cfg = Config::default();
    let tools = Arc::new(ToolRegistry::builtin(&cfg.tools).unwrap());
    let mut agent = Agent::new(model.clone(), tools, &cfg.agent, &cfg.tools);

    let events = run_turn(&mut agent, "make a note").await;
    assert!(!events.iter().any(|e| matches!(e, AgentEvent::ToolCallFinished { is_error: true, .. })));
    assert_eq!(model.call_count(), 3);

    let contents: Vec<&str> = agent
        .session()
        .transcript()
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Tool { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(contents, ["", "from bash"]);
}
