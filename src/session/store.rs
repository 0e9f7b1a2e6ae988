//! Session store contract
//!
//! The narrow interface the gateway consumes. Implementations own key
//! layout and serialization; callers get definite success or failure per
//! operation and nothing else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;
use crate::error::AppResult;

/// Number of words in the session preview
const PREVIEW_WORDS: usize = 10;

/// Session metadata record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Unique session identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent append or metadata update
    pub last_updated: DateTime<Utc>,
    /// Model the session was started with
    pub model_id: String,
    /// Number of messages appended so far
    pub message_count: u64,
    /// First words of the latest assistant message
    pub preview: String,
}

impl SessionRecord {
    /// Build the preview string from an assistant message
    ///
    /// First ~10 words, with an ellipsis when the message continues.
    pub fn preview_of(content: &str) -> String {
        let words: Vec<&str> = content.split_whitespace().take(PREVIEW_WORDS).collect();
        let mut preview = words.join(" ");
        if words.len() == PREVIEW_WORDS {
            preview.push_str("...");
        }
        preview
    }
}

/// Narrow persistence interface for chat sessions
///
/// `append_message` is the single write path for conversation content; it
/// also maintains the session metadata (count, preview, last-updated) so a
/// partial update can never be observed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Whether the backing store is reachable
    async fn is_available(&self) -> bool;

    /// Create a session, generating an id when none is supplied
    async fn create_session(
        &self,
        id: Option<&str>,
        title: &str,
        model_id: &str,
    ) -> AppResult<SessionRecord>;

    /// Fetch a session record; `None` when it does not exist
    async fn get_session(&self, id: &str) -> AppResult<Option<SessionRecord>>;

    /// List sessions, most recently updated first
    async fn list_sessions(&self, limit: usize, offset: usize) -> AppResult<Vec<SessionRecord>>;

    /// Append one message, returning it with id and timestamp assigned
    async fn append_message(&self, id: &str, message: &ChatMessage) -> AppResult<ChatMessage>;

    /// List messages in insertion order, optionally only the last `limit`
    async fn list_messages(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<ChatMessage>>;

    /// Update title and/or model id, refreshing the last-updated timestamp
    async fn update_metadata(
        &self,
        id: &str,
        title: Option<&str>,
        model_id: Option<&str>,
    ) -> AppResult<()>;

    /// Remove all messages, resetting count and preview
    async fn clear_messages(&self, id: &str) -> AppResult<()>;

    /// Delete the session and its messages
    async fn delete_session(&self, id: &str) -> AppResult<()>;
}
