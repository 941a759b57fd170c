// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agent;
mod conversation;
mod events;
mod prompts;
mod session;


pub use agent::{Agent, LoopEvent};
pub use conversation::{Conversation, TranscriptError};
pub use events::AgentEvent;
pub use prompts::{system_prompt, DEFAULT_SYSTEM_PROMPT};
pub use session::{Effect, Session, Transition, TurnOutcome, TurnState};
