// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::input::InputBuffer;

// ── Character sets ────────────────────────────────────────────────────────────

const SPINNER_UNICODE: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_ASCII: &[&str] = &["|", "/", "-", "\\"];

pub fn spinner_glyph(frame: usize, ascii: bool) -> &'static str {
    let set = if ascii { SPINNER_ASCII } else { SPINNER_UNICODE };
    set[frame % set.len()]
}

fn prompt(ascii: bool) -> &'static str {
    if ascii { "> " } else { "▶ " }
}

fn border_type(ascii: bool) -> BorderType {
    if ascii { BorderType::Plain } else { BorderType::Rounded }
}

// ── Draw functions ────────────────────────────────────────────────────────────

/// Status bar at the top: model name and token totals.
pub fn draw_status(frame: &mut Frame, area: Rect, model_name: &str, tokens: (u64, u64), ascii: bool) {
    let sep = if ascii { "|" } else { "│" };
    let line = Line::from(vec![
        Span::styled(" clio ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("{sep} {model_name} "), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{sep} in:{} out:{}", tokens.0, tokens.1),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Chat pane.  `lines` are pre-wrapped; `top` is the first row shown.
pub fn draw_chat(frame: &mut Frame, area: Rect, lines: Vec<Line<'static>>, top: u16) {
    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), area);
}

/// Input line inside a bordered box.  While a turn is in flight the box
/// title carries the thinking spinner and Enter is disabled.
pub fn draw_input(
    frame: &mut Frame,
    area: Rect,
    input: &InputBuffer,
    waiting: bool,
    spinner_frame: usize,
    ascii: bool,
) {
    let (title, border_style) = if waiting {
        (
            format!(" {} Thinking... ", spinner_glyph(spinner_frame, ascii)),
            Style::default().fg(Color::Yellow),
        )
    } else {
        (String::new(), Style::default().fg(Color::DarkGray))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type(ascii))
        .border_style(border_style)
        .title(title);

    let p = prompt(ascii);
    let line = Line::from(vec![
        Span::styled(p, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(input.text().to_string()),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), area);

    // Inside the border, after the prompt.
    let x = area
        .x
        .saturating_add(1 + p.chars().count() as u16)
        .saturating_add(input.cursor_column())
        .min(area.right().saturating_sub(2));
    frame.set_cursor_position((x, area.y + 1));
}
