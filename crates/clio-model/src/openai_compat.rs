// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Driver for any endpoint speaking the OpenAI chat-completions dialect
//! (OpenRouter, OpenAI, LiteLLM, llama.cpp, vLLM, ...).
//!
//! Requests are non-streaming: the whole reply is decoded at once and only
//! the first choice is kept.
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{CompletionRequest, CompletionResponse, Message, ToolCall, ToolDefinition, Usage};

pub struct OpenAICompatProvider {
    driver_name: &'static str,
    model: String,
    api_key: Option<String>,
    chat_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    /// - `base_url` — API base that ends **before** `/chat/completions`, e.g.
    ///   `https://openrouter.ai/api/v1`
    /// - `api_key` — pre-resolved key; `None` sends no `Authorization` header
    ///   (local servers)
    pub fn new(
        driver_name: &'static str,
        model: String,
        api_key: Option<String>,
        base_url: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            driver_name,
            model,
            api_key,
            chat_url: format!("{base}/chat/completions"),
            max_tokens,
            temperature,
            client: reqwest::Client::new(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn request_body(&self, req: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": build_openai_messages(&req.messages),
        });
        if !req.tools.is_empty() {
            body["tools"] = json!(build_openai_tools(&req.tools));
        }
        if let Some(max) = self.max_tokens {
            body["max_tokens"] = json!(max);
        }
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        body
    }
}

#[async_trait]
impl crate::ModelProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        self.driver_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let body = self.request_body(&req);

        debug!(
            driver = %self.driver_name,
            model = %self.model,
            tool_count = req.tools.len(),
            message_count = req.messages.len(),
            "sending completion request"
        );
        tracing::trace!(request_body = ?body, "full completion request");

        let mut http_req = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            http_req = http_req.bearer_auth(key);
        }

        let resp = http_req
            .send()
            .await
            .with_context(|| format!("{} request failed", self.driver_name))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("{} response body could not be read", self.driver_name))?;
        if !status.is_success() {
            bail!("{} error {status}: {text}", self.driver_name);
        }

        let reply = parse_completion(&text)
            .with_context(|| format!("{} returned an unusable response", self.driver_name))?;
        debug!(
            tool_calls = reply.tool_calls.len(),
            text_len = reply.text.len(),
            "completion received"
        );
        Ok(reply)
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    /// Some servers omit it or send null; the session assigns one.
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// Normally a JSON string; some servers send the object itself.
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

/// Decode a chat-completions body into the first choice.
pub(crate) fn parse_completion(body: &str) -> anyhow::Result<CompletionResponse> {
    let wire: WireResponse = serde_json::from_str(body).context("decoding response body")?;

    let Some(choice) = wire.choices.into_iter().next() else {
        if let Some(err) = wire.error {
            bail!("provider error: {}", err.message);
        }
        bail!("no choices in response");
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id.unwrap_or_default(),
            name: tc.function.name,
            arguments: match tc.function.arguments {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            },
        })
        .collect();

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage: wire.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

/// Serialize the transcript into chat-completions messages, one per entry.
pub(crate) fn build_openai_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m {
            Message::System { text } => json!({ "role": "system", "content": text }),
            Message::User { text } => json!({ "role": "user", "content": text }),
            Message::Assistant { text, tool_calls } => {
                let mut v = json!({ "role": "assistant", "content": text });
                if !tool_calls.is_empty() {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": { "name": tc.name, "arguments": tc.arguments },
                            })
                        })
                        .collect();
                    v["tool_calls"] = json!(calls);
                }
                v
            }
            Message::Tool { tool_call_id, content } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }),
        })
        .collect()
}

pub(crate) fn build_openai_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelProvider;

    fn make_provider() -> OpenAICompatProvider {
        OpenAICompatProvider::new(
            "test-compat",
            "test-model".into(),
            None,
            "http://localhost:9999/v1/",
            Some(1024),
            None,
        )
    }

    #[test]
    fn name_and_model() {
        let p = make_provider();
        assert_eq!(p.name(), "test-compat");
        assert_eq!(p.model_name(), "test-model");
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        assert_eq!(make_provider().chat_url(), "http://localhost:9999/v1/chat/completions");
    }

    // ── Request body ──────────────────────────────────────────────────────────

    #[test]
    fn body_carries_model_messages_and_tools() {
        let req = CompletionRequest {
            messages: vec![Message::system("sys"), Message::user("hi")],
            tools: vec![ToolDefinition {
                name: "Read".into(),
                description: "read a file".into(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let body = make_provider().request_body(&req);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "Read");
        assert_eq!(body["max_tokens"], 1024);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn empty_tool_list_is_omitted() {
        let req = CompletionRequest { messages: vec![Message::user("hi")], tools: vec![] };
        assert!(make_provider().request_body(&req).get("tools").is_none());
    }

    #[test]
    fn assistant_tool_calls_serialized_as_function_calls() {
        let msgs = vec![Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("c1", "Bash", r#"{"command":"ls"}"#),
                ToolCall::new("c2", "Read", r#"{"file_path":"a"}"#),
            ],
        )];
        let out = build_openai_messages(&msgs);
        assert_eq!(out[0]["role"], "assistant");
        let calls = out[0]["tool_calls"].as_array().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["id"], "c1");
        assert_eq!(calls[0]["function"]["arguments"], r#"{"command":"ls"}"#);
        assert_eq!(calls[1]["function"]["name"], "Read");
    }

    #[test]
    fn plain_assistant_has_no_tool_calls_key() {
        let out = build_openai_messages(&[Message::assistant("hello")]);
        assert!(out[0].get("tool_calls").is_none());
    }

    #[test]
    fn tool_result_serialized_with_call_id() {
        let out = build_openai_messages(&[Message::tool_result("c1", "listing")]);
        assert_eq!(out[0]["role"], "tool");
        assert_eq!(out[0]["tool_call_id"], "c1");
        assert_eq!(out[0]["content"], "listing");
    }

    // ── Response parsing ──────────────────────────────────────────────────────

    #[test]
    fn parses_text_reply_and_usage() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}],
                       "usage":{"prompt_tokens":12,"completion_tokens":3}}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.text, "hi there");
        assert!(r.tool_calls.is_empty());
        assert_eq!(r.usage, Some(Usage { input_tokens: 12, output_tokens: 3 }));
    }

    #[test]
    fn parses_tool_calls_in_order() {
        let body = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"a","type":"function","function":{"name":"Bash","arguments":"{\"command\":\"ls .\"}"}},
            {"id":"b","type":"function","function":{"name":"Read","arguments":"{}"}}
        ]}}]}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.text, "");
        assert_eq!(r.tool_calls.len(), 2);
        assert_eq!(r.tool_calls[0], ToolCall::new("a", "Bash", r#"{"command":"ls ."}"#));
        assert_eq!(r.tool_calls[1].id, "b");
    }

    #[test]
    fn missing_call_id_decodes_as_empty() {
        let body = r#"{"choices":[{"message":{"content":"","tool_calls":[
            {"type":"function","function":{"name":"Bash","arguments":"{\"command\":\"ls\"}"}}
        ]}}]}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.tool_calls, vec![ToolCall::new("", "Bash", r#"{"command":"ls"}"#)]);
    }

    #[test]
    fn null_call_id_decodes_as_empty() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"id":null,"type":"function","function":{"name":"Read","arguments":"{}"}}
        ]}}]}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.tool_calls[0].id, "");
        assert_eq!(r.tool_calls[0].name, "Read");
    }

    #[test]
    fn object_arguments_are_reencoded() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"id":"a","function":{"name":"Bash","arguments":{"command":"pwd"}}}
        ]}}]}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.tool_calls[0].arguments, r#"{"command":"pwd"}"#);
    }

    #[test]
    fn empty_text_without_tools_is_not_an_error() {
        let r = parse_completion(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap();
        assert_eq!(r, CompletionResponse::default());
    }

    #[test]
    fn empty_choice_list_is_an_error() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no choices in response"));
    }

    #[test]
    fn embedded_provider_error_is_reported() {
        let err = parse_completion(r#"{"error":{"message":"rate limited","code":429}}"#).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(parse_completion("<html>bad gateway</html>").is_err());
    }
}
