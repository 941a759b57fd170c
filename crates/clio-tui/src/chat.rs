// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use clio_core::AgentEvent;

pub const WELCOME: &str = "Welcome! Type a message and press Enter to chat.";

/// Longest tool argument text shown in an announcement.
const MAX_ARGS_CHARS: usize = 200;

/// One rendered item in the chat pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntry {
    Info(String),
    User(String),
    ToolCall { name: String, arguments: String },
    ToolFailed { name: String, first_line: String },
    Assistant(String),
    Error(String),
}

/// Display transcript.  Unlike the model-facing transcript it also holds
/// errors and informational lines.
#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self { entries: vec![ChatEntry::Info(WELCOME.to_string())] }
    }
}

impl ChatLog {
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    /// Record one agent display event.  Events with no visual form
    /// (usage, turn completion, successful tool results) are skipped.
    pub fn apply(&mut self, event: &AgentEvent) {
        let entry = match event {
            AgentEvent::UserEcho(text) => ChatEntry::User(text.clone()),
            AgentEvent::AssistantText(text) => ChatEntry::Assistant(text.clone()),
            AgentEvent::ToolCallAnnounced { name, arguments } => ChatEntry::ToolCall {
                name: name.clone(),
                arguments: shorten(arguments, MAX_ARGS_CHARS),
            },
            AgentEvent::ToolCallFinished { name, output, is_error: true, .. } => {
                ChatEntry::ToolFailed {
                    name: name.clone(),
                    first_line: output
                        .lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty())
                        .unwrap_or("failed")
                        .to_string(),
                }
            }
            AgentEvent::ErrorAnnounced(text) => ChatEntry::Error(text.clone()),
            AgentEvent::ToolCallFinished { .. } | AgentEvent::Usage { .. } | AgentEvent::TurnComplete => {
                return
            }
        };
        self.entries.push(entry);
    }

    /// Render every entry, wrapped to `width` columns, with one blank row
    /// between entries.
    pub fn render(&self, width: u16, ascii: bool) -> Vec<Line<'static>> {
        let width = usize::from(width.max(8));
        let mut out = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(Line::raw(""));
            }
            let (prefix, text, style) = describe(entry, ascii);
            let body_width = width.saturating_sub(prefix.width()).max(1);
            let indent = " ".repeat(prefix.width());
            let mut first = true;
            for logical in text.split('\n') {
                for row in wrap(logical, body_width) {
                    let lead = if first { prefix.to_string() } else { indent.clone() };
                    first = false;
                    out.push(Line::from(vec![
                        Span::styled(lead, style.add_modifier(Modifier::BOLD)),
                        Span::styled(row, style),
                    ]));
                }
            }
        }
        out
    }
}

fn describe(entry: &ChatEntry, ascii: bool) -> (&'static str, String, Style) {
    match entry {
        ChatEntry::Info(t) => ("", t.clone(), Style::default().fg(Color::DarkGray)),
        ChatEntry::User(t) => (
            if ascii { "> " } else { "▶ " },
            t.clone(),
            Style::default().fg(Color::Cyan),
        ),
        ChatEntry::ToolCall { name, arguments } => (
            if ascii { "* " } else { "⚡ " },
            format!("{name}({arguments})"),
            Style::default().fg(Color::Yellow),
        ),
        ChatEntry::ToolFailed { name, first_line } => (
            "  ",
            format!("{name}: {first_line}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ),
        ChatEntry::Assistant(t) => ("", t.clone(), Style::default()),
        ChatEntry::Error(t) => (
            if ascii { "x " } else { "✖ " },
            t.clone(),
            Style::default().fg(Color::Red),
        ),
    }
}

/// Hard-wrap `text` at `width` display columns.  An empty string yields
/// one empty row.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut used = 0;
    for c in text.chars() {
        let c = if c == '\t' { ' ' } else { c };
        let w = c.width().unwrap_or(0);
        if used + w > width && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            used = 0;
        }
        row.push(c);
        used += w;
    }
    rows.push(row);
    rows
}

fn shorten(s: &str, max_chars: usize) -> String {
    let flat: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
