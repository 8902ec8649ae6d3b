//! `OpenAiCompatibleProvider` against a fake HTTP endpoint (spec.md §4.5/§8),
//! mirroring the teacher's provider test files which stand up a `wiremock`
//! server instead of hitting a real API.

use gsh_script::llm::{ChatCompletion, OpenAiCompatibleProvider, StreamCallbacks, StreamingChatCompletion, ToolSchema};
use gsh_script::value::{ConversationValue, Message, ModelValue};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(base_url: &str) -> ModelValue {
    let mut m = ModelValue::new("test", "openai", "gpt-4o-mini");
    m.base_url = Some(base_url.to_string());
    m.api_key = Some("sk-test".to_string());
    m
}

fn conversation(text: &str) -> ConversationValue {
    let mut c = ConversationValue::default();
    c.push(Message::user(text));
    c
}

#[tokio::test]
async fn non_streaming_completion_parses_content_and_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {
                    "content": "hello there",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "lookup", "arguments": "{\"q\":\"rust\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new();
    let model = model(&server.uri());
    let conversation = conversation("hi");
    let response = provider
        .chat_completion(&model, &conversation, &[] as &[ToolSchema])
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("hello there"));
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "lookup");
    assert_eq!(response.tool_calls[0].id, "call_1");
}

#[tokio::test]
async fn non_streaming_completion_aggregates_cached_token_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": { "content": "hi" },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 100,
                "completion_tokens": 10,
                "total_tokens": 110,
                "prompt_tokens_details": { "cached_tokens": 64 }
            }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new();
    let model = model(&server.uri());
    let conversation = conversation("hi");
    let response = provider
        .chat_completion(&model, &conversation, &[] as &[ToolSchema])
        .await
        .unwrap();

    let usage = response.usage.expect("usage should be present");
    assert_eq!(usage.prompt_tokens, Some(100));
    assert_eq!(usage.cached_tokens, Some(64));
}

#[tokio::test]
async fn provider_error_status_becomes_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new();
    let model = model(&server.uri());
    let conversation = conversation("hi");
    let err = provider
        .chat_completion(&model, &conversation, &[] as &[ToolSchema])
        .await
        .unwrap_err();

    match err {
        gsh_script::llm::LLMError::Provider { status, .. } => assert_eq!(status, Some(401)),
        other => panic!("expected a Provider error, got {other}"),
    }
}

#[tokio::test]
async fn streaming_completion_fires_content_and_tool_pending_callbacks() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_9\",\"function\":{\"name\":\"search\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{}\"}}]}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new();
    let model = model(&server.uri());
    let conversation = conversation("hi");

    let mut seen_content = String::new();
    let mut pending_calls = Vec::new();
    let callbacks = StreamCallbacks {
        on_content: Box::new(|chunk| seen_content.push_str(chunk)),
        on_tool_pending: Box::new(|call| pending_calls.push(call.name.clone())),
        should_cancel: Box::new(|| false),
    };

    let response = provider
        .stream_chat_completion(&model, &conversation, &[] as &[ToolSchema], callbacks)
        .await
        .unwrap();

    assert_eq!(seen_content, "hello");
    assert_eq!(pending_calls, vec!["search".to_string()]);
    assert_eq!(response.content.as_deref(), Some("hello"));
}

#[tokio::test]
async fn streaming_completion_stops_promptly_when_cancelled() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new();
    let model = model(&server.uri());
    let conversation = conversation("hi");

    let callbacks = StreamCallbacks {
        on_content: Box::new(|_| {}),
        on_tool_pending: Box::new(|_| {}),
        should_cancel: Box::new(|| true),
    };

    let err = provider
        .stream_chat_completion(&model, &conversation, &[] as &[ToolSchema], callbacks)
        .await
        .unwrap_err();

    assert!(matches!(err, gsh_script::llm::LLMError::Cancelled));
}
