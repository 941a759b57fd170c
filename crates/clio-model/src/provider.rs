// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse};

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send the transcript and tool list, returning the first choice.
    ///
    /// Every error is a loop-level failure: transport, non-2xx status,
    /// an undecodable body or an empty choice list.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse>;
}
