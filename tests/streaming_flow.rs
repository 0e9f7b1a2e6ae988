//! Streaming flow against mocked backends
//!
//! Drives the full path from native wire bytes through adapter chunk
//! parsing and the stream normalizer, asserting the SSE frame contract:
//! repaired content frames, exactly one terminal frame, terminal frame last.

use futures::StreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prism::adapters::GenerationParams;
use prism::api::{ChatMessage, Role};
use prism::error::AppError;
use prism::router::CompletionRouter;
use prism::streaming::{normalize, SseEventKind, SseFrame};
use prism::Config;

fn test_config(openai_url: &str, inference_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        redis_url: "redis://localhost:6379".to_string(),
        openai_api_url: openai_url.to_string(),
        openai_api_key: Some("test-key".to_string()),
        openai_deployed_models: Vec::new(),
        inference_api_url: inference_url.to_string(),
        inference_api_key: Some("test-key".to_string()),
        request_timeout_secs: 5,
        first_chunk_timeout_secs: 2,
    }
}

async fn router_with_mocks() -> (CompletionRouter, MockServer, MockServer) {
    let openai = MockServer::start().await;
    let inference = MockServer::start().await;
    let config = test_config(&openai.uri(), &inference.uri());
    let router = CompletionRouter::new(reqwest::Client::new(), &config);
    (router, openai, inference)
}

fn user_message(content: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::new(Role::User, content)]
}

fn frame_content(frame: &SseFrame) -> String {
    let payload: Value = serde_json::from_str(&frame.data).unwrap();
    payload["content"].as_str().unwrap_or_default().to_string()
}

async fn collect_frames(router: &CompletionRouter, model: &str) -> Vec<SseFrame> {
    let deltas = router
        .stream(model, &user_message("hi"), &GenerationParams::default(), None)
        .await
        .unwrap();
    normalize(deltas, None).collect().await
}

#[tokio::test]
async fn gpt_stream_repairs_split_code_fence() {
    let (router, openai, _inference) = router_with_mocks().await;

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"```python\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"\\nprint(1)\\n```\"},\"finish_reason\":null}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sse_body)
                .insert_header("Content-Type", "text/event-stream"),
        )
        .mount(&openai)
        .await;

    let frames = collect_frames(&router, "gpt-4").await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frame_content(&frames[0]), "```python\n");
    assert_eq!(frame_content(&frames[1]), "\nprint(1)\n```\n");
    assert_eq!(frames[2].event, SseEventKind::Done);
    assert_eq!(frame_content(&frames[2]), "[DONE]");
}

#[tokio::test]
async fn claude_stream_stop_event_closes_stream() {
    let (router, _openai, inference) = router_with_mocks().await;

    // Newline-delimited native events: bookkeeping, text, stop-reason-only.
    let stream_body = concat!(
        "{\"type\":\"message_start\",\"message\":{\"role\":\"assistant\"}}\n",
        "{\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n",
        "{\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n",
        "{\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n",
    );

    Mock::given(method("POST"))
        .and(path(
            "/model/anthropic.claude-instant-v1/invoke-with-response-stream",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_body))
        .mount(&inference)
        .await;

    let frames = collect_frames(&router, "anthropic.claude-instant-v1").await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frame_content(&frames[0]), "Hello");
    assert_eq!(frame_content(&frames[1]), " there");
    assert_eq!(frames[2].event, SseEventKind::Done);

    let terminal_count = frames
        .iter()
        .filter(|f| matches!(f.event, SseEventKind::Done | SseEventKind::Error))
        .count();
    assert_eq!(terminal_count, 1);
}

#[tokio::test]
async fn titan_stream_completion_reason_closes_stream() {
    let (router, _openai, inference) = router_with_mocks().await;

    let stream_body = concat!(
        "{\"outputText\":\"Titan \",\"index\":0}\n",
        "{\"outputText\":\"stream\",\"index\":0}\n",
        "{\"completionReason\":\"FINISH\"}\n",
    );

    Mock::given(method("POST"))
        .and(path(
            "/model/amazon.titan-text-express-v1/invoke-with-response-stream",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_body))
        .mount(&inference)
        .await;

    let frames = collect_frames(&router, "amazon.titan-text-express-v1").await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frame_content(&frames[0]), "Titan ");
    assert_eq!(frame_content(&frames[1]), "stream");
    assert_eq!(frames[2].event, SseEventKind::Done);
}

#[tokio::test]
async fn upstream_error_body_becomes_single_error_frame() {
    let (router, _openai, inference) = router_with_mocks().await;

    // Unmapped model rejected as alias-required: the stream never opens and
    // the caller gets exactly one terminal error frame.
    Mock::given(method("POST"))
        .and(path(
            "/model/meta.llama3-2-1b-instruct-v1%3A0/invoke-with-response-stream",
        ))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "ValidationException: Invocation of model ID with on-demand throughput isn't supported.",
        ))
        .expect(1)
        .mount(&inference)
        .await;

    let err = match router
        .stream(
            "meta.llama3-2-1b-instruct-v1:0",
            &user_message("hi"),
            &GenerationParams::default(),
            None,
        )
        .await
    {
        Ok(_) => panic!("expected stream to fail to open"),
        Err(e) => e,
    };

    assert!(matches!(err, AppError::AliasRequired(_)));

    // The route layer renders open-failures as one terminal frame.
    let frame = SseFrame::error(&err);
    assert_eq!(frame.event, SseEventKind::Error);
    let payload: Value = serde_json::from_str(&frame.data).unwrap();
    let message = payload["error"].as_str().unwrap();
    assert!(message.starts_with("Streaming error: "));
    assert!(message.contains("inference profile"));

    assert_eq!(
        inference.received_requests().await.unwrap().len(),
        1,
        "no second backend call may be made"
    );
}

#[tokio::test]
async fn mistral_stream_chunks_reduce_to_deltas() {
    let (router, _openai, inference) = router_with_mocks().await;

    let stream_body = concat!(
        "{\"outputs\":[{\"text\":\"Bonjour\"}]}\n",
        "{\"outputs\":[{\"text\":\"\",\"stop_reason\":\"stop\"}]}\n",
    );

    Mock::given(method("POST"))
        .and(path(
            "/model/mistral.mistral-7b-instruct-v0%3A2/invoke-with-response-stream",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_body))
        .mount(&inference)
        .await;

    let frames = collect_frames(&router, "mistral.mistral-7b-instruct-v0:2").await;

    assert_eq!(frames.len(), 2);
    assert_eq!(frame_content(&frames[0]), "Bonjour");
    assert_eq!(frames[1].event, SseEventKind::Done);
}
