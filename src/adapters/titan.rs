//! Titan-style adapter
//!
//! Titan models take the whole conversation as a single prompt string with
//! `System:` / `Human:` / `Assistant:` role markers, closed with a trailing
//! `Assistant: ` cue. Stream chunks carry `outputText`, with the final chunk
//! carrying a `completionReason`.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::{ChatMessage, Role};

/// Adapter for Titan-style models
#[derive(Debug, Clone, Copy, Default)]
pub struct TitanAdapter;

/// Flatten a conversation into Titan's prompt format
///
/// System lines come first, separated from the dialogue by a blank line so
/// the model does not read them as part of the first human turn.
fn format_prompt(messages: &[ChatMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 2);

    for msg in messages {
        if msg.role == Role::System {
            lines.push(format!("System: {}", msg.content));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    for msg in messages {
        match msg.role {
            Role::User => lines.push(format!("Human: {}", msg.content)),
            Role::Assistant => lines.push(format!("Assistant: {}", msg.content)),
            Role::System => {}
        }
    }

    lines.join("\n") + "\nAssistant: "
}

impl VendorAdapter for TitanAdapter {
    fn name(&self) -> &'static str {
        "titan"
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
        json!({
            "inputText": format_prompt(messages),
            "textGenerationConfig": {
                "maxTokenCount": params.max_tokens(),
                "temperature": params.temperature(),
                "topP": params.top_p(),
                "stopSequences": [],
            },
        })
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["results"][0]["outputText"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("results[0].outputText"))?;
        if content.is_empty() {
            return Err(DecodeError("empty completion content".to_string()));
        }

        let stop_reason = raw["results"][0]["completionReason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r))
            .unwrap_or_else(|| "stop".to_string());

        Ok(Completion {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn parse_chunk(&self, raw: &Value) -> Option<Delta> {
        let content = raw["outputText"].as_str().unwrap_or_default();
        let stop_reason = raw["completionReason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r));

        if content.is_empty() && stop_reason.is_none() {
            return None;
        }

        Some(Delta {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn normalize_stop_reason(&self, reason: &str) -> String {
        match reason {
            "FINISH" | "FINISHED" => "stop".to_string(),
            "LENGTH" => "length".to_string(),
            _ => "stop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> TitanAdapter {
        TitanAdapter
    }

    #[test]
    fn test_prompt_role_markers() {
        let messages = vec![
            ChatMessage::new(Role::System, "Be brief."),
            ChatMessage::new(Role::User, "Hello"),
            ChatMessage::new(Role::Assistant, "Hi!"),
            ChatMessage::new(Role::User, "How are you?"),
        ];

        let prompt = format_prompt(&messages);

        assert_eq!(
            prompt,
            "System: Be brief.\n\nHuman: Hello\nAssistant: Hi!\nHuman: How are you?\nAssistant: "
        );
    }

    #[test]
    fn test_prompt_without_system() {
        let messages = vec![ChatMessage::new(Role::User, "Hello")];

        assert_eq!(format_prompt(&messages), "Human: Hello\nAssistant: ");
    }

    #[test]
    fn test_format_request_config() {
        let messages = vec![ChatMessage::new(Role::User, "Hi")];
        let params = GenerationParams {
            max_tokens: Some(100),
            ..Default::default()
        };

        let body = adapter().format_request("amazon.titan-text-express-v1", &messages, &params);

        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 100);
        assert_eq!(body["textGenerationConfig"]["topP"], 0.9);
        assert!(body["textGenerationConfig"]["stopSequences"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_response() {
        let raw = serde_json::json!({
            "results": [{"outputText": "Titan says hi", "completionReason": "FINISH"}]
        });

        let completion = adapter().parse_response(&raw).unwrap();
        assert_eq!(completion.content, "Titan says hi");
        assert_eq!(completion.stop_reason, "stop");
    }

    #[test]
    fn test_parse_chunk_text() {
        let raw = serde_json::json!({"outputText": "chunk", "index": 0});

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert_eq!(delta.content, "chunk");
        assert!(delta.stop_reason.is_none());
    }

    #[test]
    fn test_parse_chunk_completion_reason_only() {
        let raw = serde_json::json!({"completionReason": "LENGTH"});

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert!(delta.content.is_empty());
        assert_eq!(delta.stop_reason.as_deref(), Some("length"));
    }

    #[test]
    fn test_parse_chunk_empty_dropped() {
        let raw = serde_json::json!({"index": 0});
        assert!(adapter().parse_chunk(&raw).is_none());
    }
}
