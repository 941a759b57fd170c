// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod app;
mod chat;
mod input;
mod keys;
mod layout;
mod widgets;

pub use app::{App, AppOptions};
