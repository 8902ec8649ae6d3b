//! Wire-level chat message/request/response types (spec.md §4.5), grounded
//! on `vtcode-core/src/llm/provider/message.rs` and `request.rs`'s
//! content-parts model, generalized over the `value::conversation` types.

use crate::value::{ContentPart, ConversationValue, Message, Role, ToolCall};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub tools: Vec<ToolSchema>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub top_p: Option<f64>,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Prompt-cache annotation applied only to the final message of a
    /// request (spec.md §4.5 point 6): `{"type": "ephemeral", "ttl": "5m"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub ttl: &'static str,
}

impl CacheControl {
    pub fn ephemeral_5m() -> Self {
        Self {
            kind: "ephemeral",
            ttl: "5m",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireFunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Converts a `ConversationValue` into wire messages, annotating the final
/// message with `cache_control` (spec.md §4.5 point 6).
pub fn to_wire_messages(conversation: &ConversationValue) -> Vec<WireMessage> {
    let len = conversation.messages.len();
    conversation
        .messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mut wire = message_to_wire(m);
            if i + 1 == len {
                wire.cache_control = Some(CacheControl::ephemeral_5m());
            }
            wire
        })
        .collect()
}

fn message_to_wire(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let content = Some(content_to_json(message));
    WireMessage {
        role,
        content,
        name: message.name.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls: message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    kind: "function",
                    function: WireFunctionCall {
                        name: c.name.clone(),
                        arguments: c.arguments_json.clone(),
                    },
                })
                .collect()
        }),
        cache_control: None,
    }
}

/// Converts a message's content into a parts sequence (spec.md §4.5 point
/// 2), even a plain-text message: a lone `ContentPart::Text` still emits a
/// `{"type": "text", "text": ...}` object with the `text` field always
/// present (empty string included) rather than an omitted field, since some
/// providers reject a part missing it outright.
fn content_to_json(message: &Message) -> serde_json::Value {
    match &message.content {
        crate::value::MessageContent::Text(text) => {
            serde_json::json!([{"type": "text", "text": text}])
        }
        crate::value::MessageContent::Parts(parts) => serde_json::Value::Array(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text(t) => serde_json::json!({"type": "text", "text": t}),
                    ContentPart::Image { url } => {
                        serde_json::json!({"type": "image_url", "image_url": {"url": url}})
                    }
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// Token accounting for a completion (spec.md §4.5 point 6): `cached_tokens`
/// comes from `prompt_tokens_details.cached_tokens` when the provider
/// reports it (prompt-cache hits are billed differently from a cold prompt).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub cached_tokens: Option<u64>,
}

/// Pulls `{prompt_tokens, completion_tokens, total_tokens,
/// prompt_tokens_details.cached_tokens}` out of a raw response/chunk's
/// `usage` object, tolerating providers that omit any subset of the fields.
pub fn parse_usage(json: &serde_json::Value) -> Option<Usage> {
    let usage = json.get("usage")?;
    Some(Usage {
        prompt_tokens: usage.get("prompt_tokens").and_then(|v| v.as_u64()),
        completion_tokens: usage.get("completion_tokens").and_then(|v| v.as_u64()),
        total_tokens: usage.get("total_tokens").and_then(|v| v.as_u64()),
        cached_tokens: usage
            .pointer("/prompt_tokens_details/cached_tokens")
            .and_then(|v| v.as_u64()),
    })
}
