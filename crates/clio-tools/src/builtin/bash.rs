// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use clio_model::ToolCall;

use crate::tool::{parse_args, Tool, ToolErrorKind, ToolOutput};

/// Hard byte ceiling for the combined output returned to the model.
const OUTPUT_LIMIT_BYTES: usize = 20_000;

/// Lines kept from each end of oversized output.
const EDGE_LINES: usize = 100;

#[derive(Deserialize)]
struct BashArgs {
    command: String,
}

/// Runs a command line through `sh -c` and returns stdout and stderr
/// interleaved in arrival order.
pub struct BashTool {
    timeout: Duration,
}

impl BashTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout: Duration::from_secs(timeout_secs) }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new(30)
    }
}

type Sink = Arc<Mutex<Vec<u8>>>;

fn lock(sink: &Sink) -> MutexGuard<'_, Vec<u8>> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Copy everything `reader` produces into the shared sink until EOF.
fn drain<R>(reader: Option<R>, sink: Sink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut reader) = reader else { return };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
            }
        }
    })
}

/// Kill the shell and everything it started.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // The child called setsid(), so its pid is also its process-group id.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "Bash"
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: BashArgs = match parse_args(call) {
            Ok(a) => a,
            Err(out) => return out,
        };
        debug!(cmd = %args.command, "executing bash tool");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&args.command);
        // No stdin, and a fresh session so the command cannot reach the
        // controlling terminal the UI is drawing on.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return ToolOutput::err(
                    &call.id,
                    ToolErrorKind::Execution,
                    format!("error: failed to start shell: {e}"),
                )
            }
        };
        let pid = child.id();

        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let out_task = drain(child.stdout.take(), sink.clone());
        let err_task = drain(child.stderr.take(), sink.clone());
        let readers = [out_task.abort_handle(), err_task.abort_handle()];

        let run = async move {
            let status = child.wait().await;
            let _ = tokio::join!(out_task, err_task);
            status
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(status)) => {
                let output = head_tail_truncate(&String::from_utf8_lossy(&lock(&sink)));
                if status.success() {
                    ToolOutput::ok(&call.id, output)
                } else {
                    let reason = match status.code() {
                        Some(code) => format!("exit status {code}"),
                        None => "terminated by signal".to_string(),
                    };
                    ToolOutput::err(&call.id, ToolErrorKind::Execution, format!("{output}\nerror: {reason}"))
                }
            }
            Ok(Err(e)) => ToolOutput::err(&call.id, ToolErrorKind::Execution, format!("error: {e}")),
            Err(_) => {
                warn!(cmd = %args.command, secs = self.timeout.as_secs(), "bash tool timed out");
                kill_process_group(pid);
                for r in &readers {
                    r.abort();
                }
                let partial = head_tail_truncate(&String::from_utf8_lossy(&lock(&sink)));
                ToolOutput::err(
                    &call.id,
                    ToolErrorKind::Timeout,
                    format!("{partial}\ntimed out after {}s", self.timeout.as_secs()),
                )
            }
        }
    }
}

/// Fit `s` within `OUTPUT_LIMIT_BYTES`, keeping the first and last
/// `EDGE_LINES` lines around an omission marker.
pub(crate) fn head_tail_truncate(s: &str) -> String {
    if s.len() <= OUTPUT_LIMIT_BYTES {
        return s.to_string();
    }

    let lines: Vec<&str> = s.lines().collect();
    if lines.len() > EDGE_LINES * 2 {
        let head = lines[..EDGE_LINES].join("\n");
        let tail = lines[lines.len() - EDGE_LINES..].join("\n");
        let omitted = lines.len() - EDGE_LINES * 2;
        let candidate = format!("{head}\n...[{omitted} lines omitted]...\n{tail}");
        if candidate.len() <= OUTPUT_LIMIT_BYTES {
            return candidate;
        }
    }

    // Few but very long lines: cut on byte budget, respecting char boundaries.
    let half = OUTPUT_LIMIT_BYTES / 2;
    let mut head_end = half;
    while !s.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = s.len() - half;
    while !s.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    format!(
        "{}\n...[{} bytes omitted]...\n{}",
        &s[..head_end],
        tail_start - head_end,
        &s[tail_start..]
    )
}
