// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// All logical actions the TUI can perform, independent of key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Input line
    InputChar(char),
    InputBackspace,
    InputDelete,
    InputMoveLeft,
    InputMoveRight,
    InputMoveStart,
    InputMoveEnd,
    InputDeleteToStart,
    Submit,

    // Chat pane
    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    ScrollBottom,

    Quit,
}

/// Map a raw key event to an [`Action`].  Key releases are ignored.
pub fn map_key(event: KeyEvent) -> Option<Action> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);

    match event.code {
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        KeyCode::Char('d') if ctrl => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Quit),

        KeyCode::Char('u') if ctrl => Some(Action::InputDeleteToStart),
        KeyCode::Char('a') if ctrl => Some(Action::InputMoveStart),
        KeyCode::Char('e') if ctrl => Some(Action::InputMoveEnd),

        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::InputBackspace),
        KeyCode::Delete => Some(Action::InputDelete),
        KeyCode::Left => Some(Action::InputMoveLeft),
        KeyCode::Right => Some(Action::InputMoveRight),
        KeyCode::Home => Some(Action::InputMoveStart),
        KeyCode::End if ctrl => Some(Action::ScrollBottom),
        KeyCode::End => Some(Action::InputMoveEnd),

        KeyCode::Up => Some(Action::ScrollUp),
        KeyCode::Down => Some(Action::ScrollDown),
        KeyCode::PageUp => Some(Action::ScrollPageUp),
        KeyCode::PageDown => Some(Action::ScrollPageDown),

        // Printable characters, only without a ctrl/alt modifier
        KeyCode::Char(c) if !ctrl && !alt => Some(Action::InputChar(c)),

        _ => None,
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
