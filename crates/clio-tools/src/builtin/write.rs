// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use clio_model::ToolCall;

use crate::tool::{parse_args, Tool, ToolErrorKind, ToolOutput};

#[derive(Deserialize)]
struct WriteArgs {
    file_path: String,
    content: String,
}

/// Creates or truncates the target and writes `content` verbatim.
pub struct WriteTool;

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "Write"
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: WriteArgs = match parse_args(call) {
            Ok(a) => a,
            Err(out) => return out,
        };
        debug!(path = %args.file_path, bytes = args.content.len(), "write tool");

        let fail = |msg: String| ToolOutput::err(&call.id, ToolErrorKind::Execution, msg);

        if let Some(parent) = Path::new(&args.file_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return fail(format!("error creating or truncating file: {e}"));
                }
            }
        }

        match tokio::fs::write(&args.file_path, args.content.as_bytes()).await {
            Ok(()) => ToolOutput::ok(&call.id, format!("successfully written to: {}", args.file_path)),
            Err(e) => fail(format!("error writing to file: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builtin::ReadTool;

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall::new("w1", name, args.to_string())
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let content = "first line\n  indented\nno trailing newline";

        let w = WriteTool
            .execute(&call("Write", json!({ "file_path": path, "content": content })))
            .await;
        assert!(!w.is_error(), "{}", w.content);
        assert_eq!(w.content, format!("successfully written to: {}", path.display()));

        let r = ReadTool.execute(&call("Read", json!({ "file_path": path }))).await;
        assert_eq!(r.content, content);
    }

    #[tokio::test]
    async fn overwrite_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a much longer previous body").unwrap();

        WriteTool
            .execute(&call("Write", json!({ "file_path": path, "content": "short" })))
            .await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        let out = WriteTool
            .execute(&call("Write", json!({ "file_path": path, "content": "nested" })))
            .await;
        assert!(!out.is_error(), "{}", out.content);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "nested");
    }

    #[tokio::test]
    async fn writing_to_a_directory_fails_with_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = WriteTool
            .execute(&call("Write", json!({ "file_path": dir.path(), "content": "x" })))
            .await;
        assert_eq!(out.error, Some(ToolErrorKind::Execution));
        assert!(out.content.starts_with("error writing to file:"), "{}", out.content);
    }

    #[tokio::test]
    async fn missing_content_is_parse_error() {
        let out = WriteTool.execute(&call("Write", json!({ "file_path": "x" }))).await;
        assert_eq!(out.error, Some(ToolErrorKind::InvalidArguments));
    }
}
