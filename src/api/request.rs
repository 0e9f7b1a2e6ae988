//! Inbound request types
//!
//! The uniform completion request accepted by both the streaming and
//! non-streaming endpoints.

use serde::{Deserialize, Serialize};

use super::types::ChatMessage;

/// Uniform chat completion request
///
/// `model` selects the vendor adapter by prefix; everything else is
/// adapter-neutral. Generation parameters left unset fall back to the
/// defaults in [`crate::prompt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation, oldest first
    pub messages: Vec<ChatMessage>,
    /// Logical model identifier (e.g. "gpt-4", "anthropic.claude-3-sonnet-20240229-v1:0")
    pub model: String,
    /// Whether the caller expects an SSE stream
    #[serde(default)]
    pub stream: bool,
    /// Custom system prompt; the markdown default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling parameter (families that support it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Explicit inference-profile alias, used verbatim when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_override: Option<String>,
    /// Session to read history from and persist the exchange into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Whether to persist this exchange into the session
    #[serde(default)]
    pub persist_to_session: bool,
}
