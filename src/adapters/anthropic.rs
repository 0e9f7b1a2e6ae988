//! Claude-style adapter
//!
//! Claude models on the inference service want the system prompt as a
//! separate top-level field and message content as an array of typed text
//! blocks. Streaming interleaves `content_block_delta` events (text) with a
//! `message_delta` event that carries only the stop reason; the latter must
//! not be dropped or the stream never closes.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::{ChatMessage, Role};

/// API version header required by the inference service for this family
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Adapter for Claude-style models
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl VendorAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Inference
    }

    fn format_request(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Value {
        // System-role messages are folded into the `system` field upstream
        // (see prompt::prepare_messages); any stragglers are collected here
        // so they never land in the messages array, which the API rejects.
        let mut system = params.system.clone();
        let mut formatted = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => {
                    let system = system.get_or_insert_with(String::new);
                    if !system.is_empty() {
                        system.push_str("\n\n");
                    }
                    system.push_str(&msg.content);
                }
                _ if msg.content.trim().is_empty() => {}
                _ => formatted.push(json!({
                    "role": msg.role.as_str(),
                    "content": [{"type": "text", "text": msg.content}],
                })),
            }
        }

        let mut body = json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": params.max_tokens(),
            "temperature": params.temperature(),
            "messages": formatted,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        body
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["content"][0]["text"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("content[0].text"))?;
        if content.is_empty() {
            return Err(DecodeError("empty completion content".to_string()));
        }

        let stop_reason = raw["stop_reason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r))
            .unwrap_or_else(|| "stop".to_string());

        Ok(Completion {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn parse_chunk(&self, raw: &Value) -> Option<Delta> {
        match raw["type"].as_str()? {
            "content_block_delta" => {
                let text = raw["delta"]["text"].as_str()?;
                Some(Delta::content(text))
            }
            "message_delta" => {
                // Stop-reason-only event; empty content is intentional.
                let reason = raw["delta"]["stop_reason"].as_str()?;
                Some(Delta::stop(self.normalize_stop_reason(reason)))
            }
            _ => None,
        }
    }

    fn normalize_stop_reason(&self, reason: &str) -> String {
        match reason {
            "end_turn" => "stop".to_string(),
            "max_tokens" => "length".to_string(),
            "stop_sequence" => "stop".to_string(),
            _ => "stop".to_string(),
        }
    }
}
