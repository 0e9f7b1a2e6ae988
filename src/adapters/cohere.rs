//! Cohere-style adapter
//!
//! Cohere chat models take the latest user turn as `message` and the rest of
//! the conversation as `chat_history`, with roles renamed to `USER` /
//! `CHATBOT` / `SYSTEM`. Responses and chunks carry a `generations` array.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::{ChatMessage, Role};

/// Adapter for Cohere-style models
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereAdapter;

fn cohere_role(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Assistant => "CHATBOT",
        Role::System => "SYSTEM",
    }
}

impl VendorAdapter for CohereAdapter {
    fn name(&self) -> &'static str {
        "cohere"
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
        // The last message is the turn being answered; everything before it
        // becomes role-tagged history.
        let (message, history) = match messages.split_last() {
            Some((last, rest)) => (last.content.clone(), rest),
            None => (String::new(), &[] as &[ChatMessage]),
        };

        let chat_history: Vec<Value> = history
            .iter()
            .map(|m| json!({"role": cohere_role(m.role), "message": m.content}))
            .collect();

        let mut body = json!({
            "message": message,
            "chat_history": chat_history,
            "max_tokens": params.max_tokens(),
            "temperature": params.temperature(),
            "p": params.top_p(),
        });
        if let Some(top_k) = params.top_k {
            body["k"] = json!(top_k);
        }
        body
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["generations"][0]["text"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("generations[0].text"))?;
        if content.is_empty() {
            return Err(DecodeError("empty completion content".to_string()));
        }

        let stop_reason = raw["generations"][0]["finish_reason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r))
            .unwrap_or_else(|| "stop".to_string());

        Ok(Completion {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn parse_chunk(&self, raw: &Value) -> Option<Delta> {
        if let Some(generation) = raw["generations"].get(0) {
            let content = generation["text"].as_str().unwrap_or_default();
            let stop_reason = generation["finish_reason"]
                .as_str()
                .map(|r| self.normalize_stop_reason(r));

            if !content.is_empty() || stop_reason.is_some() {
                return Some(Delta {
                    content: content.to_string(),
                    stop_reason,
                });
            }
            return None;
        }

        // Some stream variants put the terminal reason at the top level.
        raw["finish_reason"]
            .as_str()
            .map(|r| Delta::stop(self.normalize_stop_reason(r)))
    }

    fn normalize_stop_reason(&self, reason: &str) -> String {
        match reason {
            "COMPLETE" => "stop".to_string(),
            "MAX_TOKENS" => "length".to_string(),
            _ => "stop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> CohereAdapter {
        CohereAdapter
    }

    #[test]
    fn test_format_request_splits_history() {
        let messages = vec![
            ChatMessage::new(Role::System, "Be brief."),
            ChatMessage::new(Role::User, "Hello"),
            ChatMessage::new(Role::Assistant, "Hi!"),
            ChatMessage::new(Role::User, "How are you?"),
        ];

        let body = adapter().format_request(
            "cohere.command-r-v1:0",
            &messages,
            &GenerationParams::default(),
        );

        assert_eq!(body["message"], "How are you?");
        let history = body["chat_history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["role"], "SYSTEM");
        assert_eq!(history[1]["role"], "USER");
        assert_eq!(history[2]["role"], "CHATBOT");
        assert_eq!(history[2]["message"], "Hi!");
    }

    #[test]
    fn test_format_request_single_message() {
        let messages = vec![ChatMessage::new(Role::User, "Hello")];

        let body = adapter().format_request(
            "cohere.command-r-v1:0",
            &messages,
            &GenerationParams::default(),
        );

        assert_eq!(body["message"], "Hello");
        assert!(body["chat_history"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_parse_response() {
        let raw = serde_json::json!({
            "generations": [{"text": "Cohere says hi", "finish_reason": "COMPLETE"}]
        });

        let completion = adapter().parse_response(&raw).unwrap();
        assert_eq!(completion.content, "Cohere says hi");
        assert_eq!(completion.stop_reason, "stop");
    }

    #[test]
    fn test_parse_response_maps_max_tokens() {
        let raw = serde_json::json!({
            "generations": [{"text": "truncated", "finish_reason": "MAX_TOKENS"}]
        });

        assert_eq!(adapter().parse_response(&raw).unwrap().stop_reason, "length");
    }

    #[test]
    fn test_parse_chunk_text() {
        let raw = serde_json::json!({"generations": [{"text": "chunk"}]});

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert_eq!(delta.content, "chunk");
        assert!(delta.stop_reason.is_none());
    }

    #[test]
    fn test_parse_chunk_top_level_finish() {
        let raw = serde_json::json!({"is_finished": true, "finish_reason": "COMPLETE"});

        let delta = adapter().parse_chunk(&raw).unwrap();
        assert!(delta.content.is_empty());
        assert_eq!(delta.stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_chunk_empty_generation_dropped() {
        let raw = serde_json::json!({"generations": [{"text": ""}]});
        assert!(adapter().parse_chunk(&raw).is_none());
    }
}
