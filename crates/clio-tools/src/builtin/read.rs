// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use clio_model::ToolCall;

use crate::tool::{parse_args, Tool, ToolErrorKind, ToolOutput};

#[derive(Deserialize)]
struct ReadArgs {
    file_path: String,
}

/// Returns the whole file as text.
pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "Read"
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: ReadArgs = match parse_args(call) {
            Ok(a) => a,
            Err(out) => return out,
        };
        debug!(path = %args.file_path, "read tool");

        match tokio::fs::read(&args.file_path).await {
            Ok(bytes) => ToolOutput::ok(&call.id, String::from_utf8_lossy(&bytes)),
            Err(e) => ToolOutput::err(
                &call.id,
                ToolErrorKind::Execution,
                format!("error reading file: {e}"),
            ),
        }
    }
}
