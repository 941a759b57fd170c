// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEventKind, MouseEventKind};
use futures::StreamExt;
use ratatui::{layout::Rect, DefaultTerminal, Frame};
use tracing::debug;

use clio_core::{Agent, AgentEvent};

use crate::{
    chat::ChatLog,
    input::InputBuffer,
    keys::{map_key, Action},
    layout::AppLayout,
    widgets::{draw_chat, draw_input, draw_status},
};

/// Rows moved per mouse wheel notch.
const WHEEL_ROWS: i32 = 3;

/// Options that influence the TUI startup.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Submitted as the first turn once the loop starts.
    pub initial_prompt: Option<String>,
    pub ascii: bool,
    /// Redraw period while a turn is in flight, in milliseconds.
    pub tick_ms: u64,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self { initial_prompt: None, ascii: false, tick_ms: 100 }
    }
}

/// Top-level TUI state.
pub struct App {
    agent: Agent,
    chat: ChatLog,
    input: InputBuffer,
    /// Rows scrolled up from the tail; 0 follows new output.
    scroll_from_bottom: u16,
    chat_height: u16,
    chat_width: u16,
    spinner_frame: usize,
    tokens: (u64, u64),
    ascii: bool,
    tick_ms: u64,
    initial_prompt: Option<String>,
    quit: bool,
}

impl App {
    pub fn new(agent: Agent, opts: AppOptions) -> Self {
        Self {
            agent,
            chat: ChatLog::default(),
            input: InputBuffer::default(),
            scroll_from_bottom: 0,
            chat_height: 1,
            chat_width: 80,
            spinner_frame: 0,
            tokens: (0, 0),
            ascii: opts.ascii,
            tick_ms: opts.tick_ms.max(10),
            initial_prompt: opts.initial_prompt,
            quit: false,
        }
    }

    /// Run the TUI event loop until the user quits.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> anyhow::Result<()> {
        if let Some(prompt) = self.initial_prompt.take() {
            self.submit_text(&prompt);
        }

        let mut crossterm_events = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(self.tick_ms));

        while !self.quit {
            terminal.draw(|frame| self.draw(frame))?;

            let waiting = self.agent.is_waiting();
            tokio::select! {
                loop_event = self.agent.next_event() => {
                    let events = self.agent.handle(loop_event);
                    self.apply_events(&events);
                }
                maybe = crossterm_events.next() => match maybe {
                    Some(Ok(event)) => self.handle_term_event(event),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                _ = tick.tick(), if waiting => {
                    self.spinner_frame = self.spinner_frame.wrapping_add(1);
                }
            }
        }

        debug!(session = %self.agent.session().id(), "tui exiting");
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let layout = AppLayout::compute(frame.area());
        self.chat_height = layout.chat_height().max(1);
        self.chat_width = layout.chat_pane.width;

        let lines = self.chat.render(self.chat_width, self.ascii);
        let top = self.top_row(lines.len());

        draw_status(frame, layout.status_bar, self.agent.model_name(), self.tokens, self.ascii);
        draw_chat(frame, layout.chat_pane, lines, top);
        draw_input(
            frame,
            layout.input_pane,
            &self.input,
            self.agent.is_waiting(),
            self.spinner_frame,
            self.ascii,
        );
    }

    // ── Events ────────────────────────────────────────────────────────────────

    fn handle_term_event(&mut self, event: Event) {
        match event {
            Event::Key(k) if k.kind != KeyEventKind::Release => {
                if let Some(action) = map_key(k) {
                    self.dispatch(action);
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => self.scroll_by(WHEEL_ROWS),
                MouseEventKind::ScrollDown => self.scroll_by(-WHEEL_ROWS),
                _ => {}
            },
            Event::Resize(w, h) => {
                let layout = AppLayout::compute(Rect::new(0, 0, w, h));
                self.chat_height = layout.chat_height().max(1);
                self.chat_width = layout.chat_pane.width;
                self.clamp_scroll();
            }
            _ => {}
        }
    }

    fn apply_events(&mut self, events: &[AgentEvent]) {
        for event in events {
            if let AgentEvent::Usage { input, output } = event {
                self.tokens.0 += u64::from(*input);
                self.tokens.1 += u64::from(*output);
            }
            self.chat.apply(event);
        }
        if !events.is_empty() {
            self.scroll_from_bottom = 0;
        }
    }

    fn submit_text(&mut self, text: &str) {
        let events = self.agent.submit(text);
        self.apply_events(&events);
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::InputChar(c) => self.input.insert(c),
            Action::InputBackspace => self.input.backspace(),
            Action::InputDelete => self.input.delete(),
            Action::InputMoveLeft => self.input.move_left(),
            Action::InputMoveRight => self.input.move_right(),
            Action::InputMoveStart => self.input.move_start(),
            Action::InputMoveEnd => self.input.move_end(),
            Action::InputDeleteToStart => self.input.delete_to_start(),

            // Enter does nothing while a turn is running; the typed text
            // stays in the buffer.
            Action::Submit => {
                if self.agent.is_waiting() || self.input.text().trim().is_empty() {
                    return;
                }
                let text = self.input.take();
                self.submit_text(&text);
            }

            Action::ScrollUp => self.scroll_by(1),
            Action::ScrollDown => self.scroll_by(-1),
            Action::ScrollPageUp => self.scroll_by(i32::from(self.page())),
            Action::ScrollPageDown => self.scroll_by(-i32::from(self.page())),
            Action::ScrollBottom => self.scroll_from_bottom = 0,

            Action::Quit => self.quit = true,
        }
    }

    // ── Scrolling ─────────────────────────────────────────────────────────────

    fn page(&self) -> u16 {
        self.chat_height.saturating_sub(1).max(1)
    }

    fn max_scroll(&self) -> u16 {
        let total = self.chat.render(self.chat_width, self.ascii).len();
        u16::try_from(total.saturating_sub(usize::from(self.chat_height))).unwrap_or(u16::MAX)
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = (i32::from(self.scroll_from_bottom) + delta).max(0);
        self.scroll_from_bottom = u16::try_from(next).unwrap_or(u16::MAX);
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.min(self.max_scroll());
    }

    fn top_row(&self, total: usize) -> u16 {
        let bottom_top = total.saturating_sub(usize::from(self.chat_height));
        let top = bottom_top.saturating_sub(usize::from(self.scroll_from_bottom));
        u16::try_from(top).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
impl App {
    /// Construct an `App` around a scripted model and the built-in tools.
    pub(crate) fn for_testing(
        model: std::sync::Arc<clio_model::ScriptedMockProvider>,
    ) -> Self {
        let tools_cfg = clio_config::ToolsConfig { bash_timeout_secs: 5, max_parallel: 4 };
        let tools = clio_tools::ToolRegistry::builtin(&tools_cfg).expect("builtin tools");
        let agent = Agent::new(
            model,
            std::sync::Arc::new(tools),
            &clio_config::AgentConfig::default(),
            &tools_cfg,
        );
        Self::new(agent, AppOptions { ascii: true, ..AppOptions::default() })
    }

    /// Set the input buffer as if the user typed `text`.
    pub(crate) fn inject_input(&mut self, text: &str) {
        self.input.take();
        text.chars().for_each(|c| self.input.insert(c));
    }

    /// Drain agent completions until the turn is over.
    pub(crate) async fn settle(&mut self) {
        while self.agent.is_waiting() {
            let ev = self.agent.next_event().await;
            let events = self.agent.handle(ev);
            self.apply_events(&events);
        }
    }
}
