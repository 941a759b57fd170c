// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::io::Write;

use tokio::sync::mpsc;

use clio_core::{Agent, AgentEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Text for one display event.  Assistant text goes to stdout so the output
/// can be piped; everything else is progress on stderr.
pub fn render(event: &AgentEvent) -> Option<(Stream, String)> {
    match event {
        AgentEvent::AssistantText(text) => Some((Stream::Stdout, text.clone())),
        AgentEvent::ToolCallAnnounced { name, arguments } => {
            Some((Stream::Stderr, format!("[clio:tool] {name}({arguments})")))
        }
        AgentEvent::ToolCallFinished { name, output, is_error: true, .. } => {
            let first = output.lines().find(|l| !l.trim().is_empty()).unwrap_or("failed");
            Some((Stream::Stderr, format!("[clio:tool] {name} failed: {first}")))
        }
        AgentEvent::ErrorAnnounced(msg) => Some((Stream::Stderr, format!("[clio:error] {msg}"))),
        AgentEvent::UserEcho(_)
        | AgentEvent::ToolCallFinished { .. }
        | AgentEvent::Usage { .. }
        | AgentEvent::TurnComplete => None,
    }
}

/// Run one turn and print it.  Fails when the turn ended with an error.
pub async fn run(mut agent: Agent, prompt: &str) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<AgentEvent>(64);

    let printer = tokio::spawn(async move {
        let mut failed = false;
        while let Some(event) = rx.recv().await {
            failed |= matches!(event, AgentEvent::ErrorAnnounced(_));
            match render(&event) {
                Some((Stream::Stdout, text)) => {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{text}");
                    let _ = out.flush();
                }
                Some((Stream::Stderr, text)) => eprintln!("{text}"),
                None => {}
            }
        }
        failed
    });

    agent.run_turn(prompt, &tx).await;
    drop(tx);

    if printer.await? {
        anyhow::bail!("turn ended with an error");
    }
    Ok(())
}
