//! The LLM provider client (spec.md §4.5): a non-streaming `ChatCompletion`
//! call and a streaming `StreamingChatCompletion` call driven by callbacks,
//! implemented once against an OpenAI-compatible HTTP API. Grounded on
//! `vtcode-core/src/llm/providers/openai/provider.rs` and
//! `streaming.rs`/`stream_decoder.rs`'s request-building and SSE-consuming
//! shape, reqwest+futures stack included.

use super::error::LLMError;
use super::message::{parse_usage, to_wire_messages, ChatResponse, ToolSchema, Usage};
use super::streaming::{parse_sse_line, SseEvent, ToolCallAccumulator};
use crate::value::{ConversationValue, ModelValue, ToolCall};
use async_trait::async_trait;
use futures::StreamExt;

#[async_trait(?Send)]
pub trait ChatCompletion {
    async fn chat_completion(
        &self,
        model: &ModelValue,
        conversation: &ConversationValue,
        tools: &[ToolSchema],
    ) -> Result<ChatResponse, LLMError>;
}

/// Callbacks driving a streaming completion (spec.md §4.5 points 3-5):
/// `on_content` fires per text delta, `on_tool_pending` fires once a tool
/// call's fragments are complete, `should_cancel` is polled between chunks
/// so a host can abort an in-flight stream.
pub struct StreamCallbacks<'a> {
    pub on_content: Box<dyn FnMut(&str) + 'a>,
    pub on_tool_pending: Box<dyn FnMut(&ToolCall) + 'a>,
    pub should_cancel: Box<dyn FnMut() -> bool + 'a>,
}

#[async_trait(?Send)]
pub trait StreamingChatCompletion {
    async fn stream_chat_completion(
        &self,
        model: &ModelValue,
        conversation: &ConversationValue,
        tools: &[ToolSchema],
        callbacks: StreamCallbacks<'_>,
    ) -> Result<ChatResponse, LLMError>;
}

/// An OpenAI-compatible provider: works against any endpoint shaped like
/// `POST {base_url}/chat/completions` (the teacher's OpenAI/OpenRouter
/// providers share this exact surface).
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
}

impl Default for OpenAiCompatibleProvider {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl OpenAiCompatibleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn request_body(
        &self,
        model: &ModelValue,
        conversation: &ConversationValue,
        tools: &[ToolSchema],
        stream: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model.model,
            "messages": to_wire_messages(conversation),
            "tools": tools,
            "temperature": model.temperature,
            "max_tokens": model.max_tokens,
            "top_p": model.top_p,
            "stream": stream,
        });
        // `stream_options.include_usage: true` asks the provider to emit a
        // final usage-bearing chunk (spec.md §6's HTTP surface); irrelevant
        // and harmlessly ignored on a non-streaming request.
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }

    /// Builds the request with `Authorization: Bearer …`, `Accept:
    /// text/event-stream` when `streaming` (spec.md §4.5 point 5), and any
    /// header overrides from the model config layered on last so a caller
    /// can override either of the above.
    fn request_builder(&self, model: &ModelValue, streaming: bool) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(format!("{}/chat/completions", model.effective_base_url()));
        if let Some(key) = &model.api_key {
            req = req.bearer_auth(key);
        }
        if streaming {
            req = req.header("Accept", "text/event-stream");
        }
        for (k, v) in &model.headers {
            req = req.header(k, v);
        }
        req
    }
}

#[async_trait(?Send)]
impl ChatCompletion for OpenAiCompatibleProvider {
    async fn chat_completion(
        &self,
        model: &ModelValue,
        conversation: &ConversationValue,
        tools: &[ToolSchema],
    ) -> Result<ChatResponse, LLMError> {
        tracing::debug!(target: "gsh::llm", model = %model.model, "sending non-streaming chat completion");
        let body = self.request_body(model, conversation, tools, false);
        let resp = self.request_builder(model, false).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::Provider {
                status: Some(status),
                message: text,
            });
        }

        let json: serde_json::Value = resp.json().await?;
        parse_non_streaming_response(&json)
    }
}

#[async_trait(?Send)]
impl StreamingChatCompletion for OpenAiCompatibleProvider {
    async fn stream_chat_completion(
        &self,
        model: &ModelValue,
        conversation: &ConversationValue,
        tools: &[ToolSchema],
        mut callbacks: StreamCallbacks<'_>,
    ) -> Result<ChatResponse, LLMError> {
        tracing::debug!(target: "gsh::llm", model = %model.model, "sending streaming chat completion");
        let body = self.request_body(model, conversation, tools, true);
        let resp = self.request_builder(model, true).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::Provider {
                status: Some(status),
                message: text,
            });
        }

        let mut stream = resp.bytes_stream();
        let mut buffer = String::new();
        let mut content = String::new();
        let mut accumulator = ToolCallAccumulator::default();
        let mut finish_reason = None;
        let mut usage: Option<Usage> = None;

        while let Some(chunk) = stream.next().await {
            if (callbacks.should_cancel)() {
                return Err(LLMError::Cancelled);
            }
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);
                match parse_sse_line(&line) {
                    Some(SseEvent::Done) => {
                        finish_reason = finish_reason.or(Some("stop".to_string()));
                    }
                    Some(SseEvent::Data(chunk_json)) => {
                        apply_stream_chunk(&chunk_json, &mut content, &mut accumulator, &mut callbacks);
                        if let Some(reason) = chunk_json
                            .pointer("/choices/0/finish_reason")
                            .and_then(|v| v.as_str())
                        {
                            finish_reason = Some(reason.to_string());
                        }
                        // A chunk carrying `usage` is recorded; the
                        // typical `stream_options.include_usage: true`
                        // case delivers it on the final chunk (spec.md
                        // §4.5 point 7).
                        if let Some(u) = parse_usage(&chunk_json) {
                            usage = Some(u);
                        }
                    }
                    None => {}
                }
            }
        }

        let tool_calls = accumulator.finish();

        Ok(ChatResponse {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

fn apply_stream_chunk(
    chunk: &serde_json::Value,
    content: &mut String,
    accumulator: &mut ToolCallAccumulator,
    callbacks: &mut StreamCallbacks<'_>,
) {
    let Some(delta) = chunk.pointer("/choices/0/delta") else {
        return;
    };
    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        content.push_str(text);
        (callbacks.on_content)(text);
    }
    if let Some(calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let index = call.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            let id = call.get("id").and_then(|v| v.as_str());
            let name = call.pointer("/function/name").and_then(|v| v.as_str());
            let args = call.pointer("/function/arguments").and_then(|v| v.as_str());
            // Fires `OnToolPending` the moment both `id` and `name` are
            // known, exactly once per call index (spec.md §4.5 point 7) —
            // not after the whole stream finishes.
            if let Some(pending) = accumulator.accumulate(index, id, name, args) {
                (callbacks.on_tool_pending)(&pending);
            }
        }
    }
}

fn parse_non_streaming_response(json: &serde_json::Value) -> Result<ChatResponse, LLMError> {
    let message = json
        .pointer("/choices/0/message")
        .ok_or_else(|| LLMError::Provider {
            status: None,
            message: "response missing choices[0].message".to_string(),
        })?;
    let content = message.get("content").and_then(|v| v.as_str()).map(str::to_string);
    let finish_reason = json
        .pointer("/choices/0/finish_reason")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let tool_calls = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|c| ToolCall {
                    id: c.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    name: c
                        .pointer("/function/name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    arguments_json: c
                        .pointer("/function/arguments")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason,
        usage: parse_usage(json),
    })
}
