//! Vendor adapters
//!
//! One adapter per backend family, translating between the uniform message
//! list and each family's native request/response/chunk shapes. The set is
//! closed: adapters are unit structs behind the [`VendorAdapter`] trait,
//! selected through the router's ordered prefix table, never by open-ended
//! subclassing. Adapters are stateless; all I/O lives in the backend clients.

pub mod anthropic;
pub mod cohere;
pub mod llama;
pub mod mistral;
pub mod openai;
pub mod titan;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ChatMessage;
use crate::prompt::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

pub use anthropic::AnthropicAdapter;
pub use cohere::CohereAdapter;
pub use llama::LlamaAdapter;
pub use mistral::MistralAdapter;
pub use openai::OpenAiAdapter;
pub use titan::TitanAdapter;

/// Which backend client an adapter speaks through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted GPT-style chat completions API
    OpenAi,
    /// Managed inference service (invoke / invoke-with-response-stream)
    Inference,
}

/// Generation parameters shared across adapters
///
/// `system` is the out-of-band system prompt for families that take one
/// separately (Claude-style); other families receive system text inline in
/// the message list.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
}

impl GenerationParams {
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn top_p(&self) -> f64 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }
}

/// Adapter-neutral unit of streamed output
///
/// Every native chunk shape reduces to this. A terminal chunk that carries
/// only a stop reason becomes a `Delta` with empty content and a populated
/// `stop_reason`; it must flow through so the normalizer can close the
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl Delta {
    /// Content-only delta
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            stop_reason: None,
        }
    }

    /// Terminal delta carrying a normalized stop reason and no text
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            stop_reason: Some(reason.into()),
        }
    }
}

/// Parsed non-streaming completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub stop_reason: String,
}

/// Failure to extract a completion from a native response
///
/// Distinct from transport failures: the backend answered, but with a shape
/// the adapter cannot reduce. The router attaches the offending model id
/// when surfacing this.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn missing(path: &str) -> Self {
        Self(format!("missing {path}"))
    }
}

/// Capability set implemented by every backend family
///
/// `format_request` builds the native body, `parse_response` reduces a
/// non-streaming native response, `parse_chunk` reduces one native stream
/// event. Chunks that carry neither text nor a terminal signal (pings,
/// block-start markers) reduce to `None` and are dropped.
pub trait VendorAdapter: Send + Sync {
    /// Family name for logging and metrics
    fn name(&self) -> &'static str;

    /// Backend client this family is served by
    fn backend(&self) -> BackendKind;

    /// Build the native request body for this family
    fn format_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> serde_json::Value;

    /// Reduce a native non-streaming response to a [`Completion`]
    ///
    /// The stop reason defaults to `"stop"` when the backend omits one.
    fn parse_response(&self, raw: &serde_json::Value) -> Result<Completion, DecodeError>;

    /// Reduce one native stream event to a [`Delta`], if it carries anything
    fn parse_chunk(&self, raw: &serde_json::Value) -> Option<Delta>;

    /// Map a family-specific stop/finish reason to the unified vocabulary
    fn normalize_stop_reason(&self, reason: &str) -> String;
}
