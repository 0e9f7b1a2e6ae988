//! Backend clients
//!
//! Thin HTTP clients for the two upstream services: the hosted GPT-style
//! chat API and the managed inference service that fronts the Claude, Titan,
//! Llama, Mistral and Cohere families. Clients own transport, wire framing,
//! and error classification; they know nothing about message formats — that
//! is the adapters' job.

pub mod inference;
pub mod openai;

use std::pin::Pin;

use futures::Stream;

use crate::error::AppResult;

pub use inference::InferenceBackend;
pub use openai::OpenAiBackend;

/// Stream of raw native events from a backend
pub type RawEventStream = Pin<Box<dyn Stream<Item = AppResult<serde_json::Value>> + Send>>;
