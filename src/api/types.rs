//! Core message types
//!
//! The message shape shared by the inbound API, the vendor adapters, and the
//! session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing instructions or context
    System,
    /// User message from the human
    User,
    /// Assistant message from the model
    Assistant,
}

impl Role {
    /// Wire name of the role, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message with role and content
///
/// Messages are immutable once stored in a session; `id`, `timestamp` and
/// `model` are populated by the session store at append time and absent on
/// inbound requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author
    pub role: Role,
    /// The content of the message
    pub content: String,
    /// Opaque message identifier, assigned on persistence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Persistence timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Model that produced this message (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatMessage {
    /// Create a bare message with no persistence metadata
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            id: None,
            timestamp: None,
            model: None,
        }
    }

    /// Compare by the `(role, content)` pair, ignoring persistence metadata
    ///
    /// Used by the session accumulator to deduplicate retried submissions.
    pub fn same_exchange(&self, other: &ChatMessage) -> bool {
        self.role == other.role && self.content == other.content
    }
}
