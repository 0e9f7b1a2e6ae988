//! Llama-style adapter
//!
//! Llama models take a single prompt assembled from special token sequences:
//! `<|begin_of_text|>`, `<|start_header_id|>role<|end_header_id|>` and
//! `<|eot_id|>`, closed with an assistant header so the model continues the
//! conversation rather than the prompt.

use serde_json::{json, Value};

use super::{BackendKind, Completion, DecodeError, Delta, GenerationParams, VendorAdapter};
use crate::api::{ChatMessage, Role};

/// Adapter for Llama-style models
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaAdapter;

/// Assemble the Llama special-token prompt
fn format_prompt(messages: &[ChatMessage]) -> String {
    let mut parts = Vec::with_capacity(messages.len() + 2);

    for msg in messages {
        match msg.role {
            Role::System => parts.push(format!(
                "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n{}<|eot_id|>",
                msg.content
            )),
            Role::User => parts.push(format!(
                "<|start_header_id|>user<|end_header_id|>\n{}<|eot_id|>",
                msg.content
            )),
            Role::Assistant => parts.push(format!(
                "<|start_header_id|>assistant<|end_header_id|>\n{}<|eot_id|>",
                msg.content
            )),
        }
    }

    // The begin-of-text marker rides on the system message when there is
    // one; otherwise it has to open the prompt on its own.
    if !messages.iter().any(|m| m.role == Role::System) {
        parts.insert(0, "<|begin_of_text|>".to_string());
    }

    parts.push("<|start_header_id|>assistant<|end_header_id|>".to_string());
    parts.join("\n")
}

impl VendorAdapter for LlamaAdapter {
    fn name(&self) -> &'static str {
        "llama"
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
            "prompt": format_prompt(messages),
            "max_gen_len": params.max_tokens(),
            "temperature": params.temperature(),
            "top_p": params.top_p(),
        })
    }

    fn parse_response(&self, raw: &Value) -> Result<Completion, DecodeError> {
        let content = raw["generation"]
            .as_str()
            .ok_or_else(|| DecodeError::missing("generation"))?;
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
        let content = raw["generation"].as_str().unwrap_or_default();
        let stop_reason = raw["stop_reason"]
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
