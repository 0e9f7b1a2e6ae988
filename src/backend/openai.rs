//! GPT-style backend client
//!
//! Speaks the hosted chat-completions API: JSON request, JSON response, and
//! `data:`-framed SSE for streaming. SSE bytes arrive without regard for
//! line boundaries, so a small line buffer reassembles events before they
//! are parsed.

use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::RawEventStream;
use crate::api::ModelInfo;
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// End-of-stream marker on the SSE wire
const SSE_DONE: &str = "[DONE]";

/// Accumulates SSE bytes into complete lines
///
/// Retains a trailing partial line across chunks; empty lines (the SSE
/// event separator) are dropped.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Client for the hosted GPT-style API
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    deployed_models: Vec<String>,
    first_chunk_timeout: Duration,
}

impl OpenAiBackend {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.openai_api_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            deployed_models: config.openai_deployed_models.clone(),
            first_chunk_timeout: Duration::from_secs(config.first_chunk_timeout_secs),
        }
    }

    fn request(&self, body: &Value) -> AppResult<reqwest::RequestBuilder> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::Upstream("OPENAI_API_KEY is not configured".to_string())
        })?;

        Ok(self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(body))
    }

    /// Non-streaming chat completion
    #[instrument(skip(self, body), fields(model = body["model"].as_str().unwrap_or("")))]
    pub async fn chat(&self, body: &Value) -> AppResult<Value> {
        let response = self.request(body)?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "GPT-style backend rejected request");
            return Err(AppError::Upstream(format!(
                "GPT-style backend returned {status}: {text}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Streaming chat completion
    ///
    /// Returns one JSON value per SSE data line, ending at the `[DONE]`
    /// marker. A stream that yields no first chunk within the configured
    /// window is a transport failure.
    pub async fn chat_stream(&self, body: &Value) -> AppResult<RawEventStream> {
        let mut body = body.clone();
        body["stream"] = Value::Bool(true);

        let response = self.request(&body)?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "GPT-style backend returned {status}: {text}"
            )));
        }

        let first_chunk_timeout = self.first_chunk_timeout;
        let events = stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = SseLineBuffer::default();
            let mut first = true;

            loop {
                let next = if first {
                    match tokio::time::timeout(first_chunk_timeout, bytes.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            yield Err(AppError::Timeout(format!(
                                "no stream data within {}s",
                                first_chunk_timeout.as_secs()
                            )));
                            return;
                        }
                    }
                } else {
                    bytes.next().await
                };
                first = false;

                match next {
                    Some(Ok(chunk)) => {
                        for line in buffer.feed(&chunk) {
                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            if data == SSE_DONE {
                                return;
                            }
                            match serde_json::from_str::<Value>(data) {
                                Ok(value) => yield Ok(value),
                                Err(err) => {
                                    debug!(error = %err, "Skipping unparseable SSE line");
                                }
                            }
                        }
                    }
                    Some(Err(err)) => {
                        yield Err(err.into());
                        return;
                    }
                    None => return,
                }
            }
        };

        Ok(Box::pin(events))
    }

    /// List the configured deployments
    ///
    /// The hosted API's deployment set is operator-configured rather than
    /// discovered, so this never makes a network call.
    pub fn list_models(&self) -> Vec<ModelInfo> {
        if self.deployed_models.is_empty() {
            return vec![
                ModelInfo {
                    id: "gpt-35-turbo".to_string(),
                    provider: "openai".to_string(),
                    name: "GPT-3.5 Turbo".to_string(),
                },
                ModelInfo {
                    id: "gpt-4".to_string(),
                    provider: "openai".to_string(),
                    name: "GPT-4".to_string(),
                },
            ];
        }

        self.deployed_models
            .iter()
            .map(|id| ModelInfo {
                id: id.clone(),
                provider: "openai".to_string(),
                name: display_name(id),
            })
            .collect()
    }
}

/// Human-readable names for well-known deployments
fn display_name(model_id: &str) -> String {
    match model_id {
        "gpt-35-turbo" => "GPT-3.5 Turbo".to_string(),
        "gpt-4" => "GPT-4".to_string(),
        "gpt-4-turbo" => "GPT-4 Turbo".to_string(),
        "gpt-4o" => "GPT-4o".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_reassembles_split_lines() {
        let mut buffer = SseLineBuffer::default();

        assert!(buffer.feed(b"data: {\"content\":\"hel").is_empty());
        assert_eq!(
            buffer.feed(b"lo\"}\n"),
            vec!["data: {\"content\":\"hello\"}"]
        );
    }

    #[test]
    fn test_line_buffer_drops_event_separators() {
        let mut buffer = SseLineBuffer::default();
        let lines = buffer.feed(b"data: first\n\ndata: second\n");

        assert_eq!(lines, vec!["data: first", "data: second"]);
    }

    #[test]
    fn test_line_buffer_strips_carriage_returns() {
        let mut buffer = SseLineBuffer::default();
        assert_eq!(buffer.feed(b"data: x\r\n"), vec!["data: x"]);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("gpt-4"), "GPT-4");
        assert_eq!(display_name("custom-deployment"), "custom-deployment");
    }
}
