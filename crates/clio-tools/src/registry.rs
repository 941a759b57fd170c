// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, warn};

use clio_config::ToolsConfig;
use clio_model::{ToolCall, ToolDefinition};

use crate::builtin::{BashTool, ReadTool, WriteTool};
use crate::definitions::{load_definitions, DefinitionError};
use crate::{Tool, ToolErrorKind, ToolOutput};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("tool {0} is registered twice")]
    Duplicate(String),
    #[error("handler {handler} registered for definition {definition}")]
    HandlerMismatch { definition: String, handler: String },
    #[error("no handler implements tool {0}")]
    MissingHandler(String),
}

struct Entry {
    definition: ToolDefinition,
    handler: Arc<dyn Tool>,
}

/// Central registry holding all available tools.
///
/// Filled once at startup and shared read-only (behind an `Arc`) afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `Read`, `Write` and `Bash` tools.
    ///
    /// Fails if any embedded definition is malformed, duplicated, or has no
    /// handler.
    pub fn builtin(cfg: &ToolsConfig) -> Result<Self, RegistryError> {
        let handlers: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ReadTool),
            Arc::new(WriteTool),
            Arc::new(BashTool::new(cfg.bash_timeout_secs)),
        ];
        let mut registry = Self::new();
        for definition in load_definitions()? {
            let handler = handlers
                .iter()
                .find(|h| h.name() == definition.name)
                .cloned()
                .ok_or_else(|| RegistryError::MissingHandler(definition.name.clone()))?;
            registry.register(definition, handler)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn Tool>,
    ) -> Result<(), RegistryError> {
        if handler.name() != definition.name {
            return Err(RegistryError::HandlerMismatch {
                definition: definition.name,
                handler: handler.name().to_string(),
            });
        }
        if self.by_name.contains_key(&definition.name) {
            return Err(RegistryError::Duplicate(definition.name));
        }
        self.by_name.insert(definition.name.clone(), self.entries.len());
        self.entries.push(Entry { definition, handler });
        Ok(())
    }

    /// Definitions in registration order, as advertised to the model.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolDefinition> {
        self.by_name.get(name).map(|&i| &self.entries[i].definition)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.definition.name.clone()).collect()
    }

    /// Run one call.  Never fails: unknown names become an error result.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.by_name.get(&call.name) {
            Some(&i) => {
                debug!(tool = %call.name, call_id = %call.id, "executing tool");
                self.entries[i].handler.execute(call).await
            }
            None => {
                warn!(tool = %call.name, "model requested unknown tool");
                ToolOutput::err(
                    &call.id,
                    ToolErrorKind::UnknownTool,
                    format!("unknown tool: {}", call.name),
                )
            }
        }
    }

    /// Run every call of one assistant turn, at most `max_parallel` at a time.
    ///
    /// Results come back in the order of `calls`, whatever order the
    /// executions finish in.  A handler that panics yields an error result
    /// for its call instead of tearing down the batch.
    pub async fn execute_batch(
        self: &Arc<Self>,
        calls: Vec<ToolCall>,
        max_parallel: usize,
    ) -> Vec<ToolOutput> {
        futures::stream::iter(calls)
            .map(|call| {
                let registry = Arc::clone(self);
                async move {
                    let call_id = call.id.clone();
                    let task = tokio::spawn(async move { registry.execute(&call).await });
                    match task.await {
                        Ok(output) => output,
                        Err(e) => ToolOutput::err(
                            call_id,
                            ToolErrorKind::Execution,
                            format!("error: tool execution panicked: {e}"),
                        ),
                    }
                }
            })
            .buffered(max_parallel.max(1))
            .collect()
            .await
    }
}
