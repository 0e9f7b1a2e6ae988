//! Outbound response types
//!
//! Uniform completion result and model-listing shapes. All backends reduce
//! to these regardless of their native response format.

use serde::{Deserialize, Serialize};

use super::types::ChatMessage;

/// A single completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// The generated assistant message
    pub message: ChatMessage,
    /// Normalized finish reason ("stop", "length", ...)
    pub finish_reason: String,
}

/// Uniform non-streaming completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response identifier
    pub id: String,
    /// Logical model that served the request
    pub model: String,
    /// Completion choices (always exactly one)
    pub choices: Vec<ChatChoice>,
    /// Session the exchange was persisted into, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Model descriptor for the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    /// Model identifier usable in completion requests
    pub id: String,
    /// Backend that serves it ("openai" or "inference")
    pub provider: String,
    /// Human-readable name
    pub name: String,
}

/// Response for the model listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}
