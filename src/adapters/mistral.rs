//! Mistral-style adapter
//!
//! Mistral instruction models take `[INST] ... [/INST]` formatted prompts
//! with system text wrapped in `<<SYS>>` blocks. Responses and chunks carry
//! an `outputs` array.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::{ChatMessage, Role};

/// Adapter for Mistral-style models
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralAdapter;

/// Assemble the `[INST]`-tagged prompt
fn format_prompt(messages: &[ChatMessage]) -> String {
    let mut parts = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => {
                parts.push(format!("[INST] <<SYS>>\n{}\n<</SYS>> [/INST]", msg.content))
            }
            Role::User => parts.push(format!("[INST] {} [/INST]", msg.content)),
            Role::Assistant => parts.push(msg.content.clone()),
        }
    }

    parts.join("\n")
}

impl VendorAdapter for MistralAdapter {
    fn name(&self) -> &'static str {
        "mistral"
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
        let mut body = json!({
            "prompt": format_prompt(messages),
            "max_tokens": params.max_tokens(),
            "temperature": params.temperature(),
            "top_p": params.top_p(),
        });
        if let Some(top_k) = params.top_k {
            body["top_k"] = json!(top_k);
        }
        body
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["outputs"][0]["text"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("outputs[0].text"))?;
        if content.is_empty() {
            return Err(DecodeError("empty completion content".to_string()));
        }

        let stop_reason = raw["outputs"][0]["stop_reason"]
            .as_str()
            .map(|r| self.normalize_stop_reason(r))
            .unwrap_or_else(|| "stop".to_string());

        Ok(Completion {
            content: content.to_string(),
            stop_reason,
        })
    }

    fn parse_chunk(&self, raw: &Value) -> Option<Delta> {
        let output = raw["outputs"].get(0)?;
        let content = output["text"].as_str().unwrap_or_default();
        let stop_reason = output["stop_reason"]
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
            "stop" => "stop".to_string(),
            "length" => "length".to_string(),
            _ => "stop".to_string(),
        }
    }
}
