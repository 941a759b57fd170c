// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// The regions that make up the TUI layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub status_bar: Rect,
    pub chat_pane: Rect,
    pub input_pane: Rect,
}

impl AppLayout {
    /// Calculate layout regions from a `Rect` (terminal area).
    pub fn compute(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        AppLayout {
            status_bar: vertical[0],
            chat_pane: vertical[1],
            input_pane: vertical[2],
        }
    }

    /// Text rows visible in the chat pane (it has no border).
    pub fn chat_height(&self) -> u16 {
        self.chat_pane.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_stack_and_fill_the_area() {
        let l = AppLayout::compute(Rect::new(0, 0, 80, 24));
        assert_eq!(l.status_bar.height, 1);
        assert_eq!(l.input_pane.height, 3);
        assert_eq!(l.chat_height(), 20);
        assert_eq!(l.chat_pane.y, 1);
        assert_eq!(l.input_pane.y + l.input_pane.height, 24);
    }
}
