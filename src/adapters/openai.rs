//! GPT-style adapter
//!
//! The uniform API is already close to the OpenAI chat shape, so formatting
//! is a near-passthrough. This adapter is also the router's fallback for
//! unrecognized model prefixes.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::ChatMessage;

/// Adapter for the hosted GPT-style chat completions API
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl VendorAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn backend(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn format_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens(),
            "temperature": params.temperature(),
            "top_p": params.top_p(),
        })
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("choices[0].message.content"))?;
        if content.is_empty() {
            return Err(DecodeError("empty completion content".to_string()));
        }

        let stop_reason = raw["choices"][0]["finish_reason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r))
            .unwrap_or_else(|| "stop".to_string());

        Ok(Completion {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn parse_chunk(&self, raw: &Value) -> Option<Delta> {
        let choice = raw["choices"].get(0)?;
        let content = choice["delta"]["content"].as_str().unwrap_or_default();
        let stop_reason = choice["finish_reason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r));

        if content.is_empty() && stop_reason.is_none() {
            // Role-only or empty keep-alive delta
            return None;
        }

        Some(Delta {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn normalize_stop_reason(&self, reason: &str) -> String {
        // Already the unified vocabulary
        match reason {
            "stop" | "length" | "content_filter" => reason.to_string(),
            _ => "stop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter
    }

    #[test]
    fn test_format_request_shape() {
        let messages = vec![
            ChatMessage::new(Role::System, "Be helpful."),
            ChatMessage::new(Role::User, "Hello"),
        ];
        let body = adapter().format_request("gpt-4", &messages, &GenerationParams::default());

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert_eq!(body["max_tokens"], 2000);
    }

    #[test]
    fn test_parse_response() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": {"role": "assistant", "content": "Hi there"},
                "finish_reason": "stop"
            }]
        });

        let completion = adapter().parse_response(&raw).unwrap();
        assert_eq!(completion.content, "Hi there");
        assert_eq!(completion.stop_reason, "stop");
    }

    #[test]
    fn test_parse_response_defaults_stop_reason() {
        let raw = serde_json::json!({
            "choices": [{"message": {"content": "Hi"}}]
        });

        let completion = adapter().parse_response(&raw).unwrap();
        assert_eq!(completion.stop_reason, "stop");
    }

    #[test]
    fn test_parse_response_missing_content_is_decode_error() {
        let raw = serde_json::json!({"choices": []});
        let err = adapter().parse_response(&raw).unwrap_err();

        assert!(err.to_string().contains("choices[0].message.content"));
    }

    #[test]
    fn test_parse_chunk_content() {
        let raw = serde_json::json!({
            "choices": [{"delta": {"content": "Hel"}, "finish_reason": null}]
        });

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert_eq!(delta.content, "Hel");
        assert!(delta.stop_reason.is_none());
    }

    #[test]
    fn test_parse_chunk_finish_reason_only() {
        let raw = serde_json::json!({
            "choices": [{"delta": {}, "finish_reason": "length"}]
        });

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert!(delta.content.is_empty());
        assert_eq!(delta.stop_reason.as_deref(), Some("length"));
    }

    #[test]
    fn test_parse_chunk_role_only_dropped() {
        let raw = serde_json::json!({
            "choices": [{"delta": {"role": "assistant"}, "finish_reason": null}]
        });

        assert!(adapter().parse_chunk(&raw).is_none());
    }
}
