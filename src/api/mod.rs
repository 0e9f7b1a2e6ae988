//! Public API types for the gateway
//!
//! Defines the uniform request and response shapes exposed to callers,
//! independent of any backend's native format.

pub mod request;
pub mod response;
pub mod types;

pub use request::CompletionRequest;
pub use response::{ChatChoice, ChatResponse, ModelInfo, ModelsResponse};
pub use types::{ChatMessage, Role};
