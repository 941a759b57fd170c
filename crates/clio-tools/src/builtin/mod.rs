// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod bash;
mod read;
mod write;

pub use bash::BashTool;
pub use read::ReadTool;
pub use write::WriteTool;
