//! Session accumulator
//!
//! Buffers the assistant turn as repaired fragments stream past and commits
//! it to the store only after the terminal `done` frame has gone out. The
//! stream is never held up by persistence, and a failed persist is logged
//! rather than injected into an already-completed SSE sequence. An aborted
//! stream discards the buffer: sessions only ever contain finished turns.

use std::sync::Arc;

use tracing::{debug, error};

use super::store::SessionStore;
use crate::api::{ChatMessage, Role};

/// Drop incoming messages already stored at the tail of the session
///
/// A caller retry re-submits the same trailing user message(s); appending
/// them again would duplicate the conversation. The longest suffix of the
/// stored history that matches a prefix of `incoming` (by `(role, content)`)
/// is skipped, making the append idempotent.
pub fn dedup_incoming<'a>(
    prior: &[ChatMessage],
    incoming: &'a [ChatMessage],
) -> &'a [ChatMessage] {
    let max_overlap = prior.len().min(incoming.len());

    for overlap in (1..=max_overlap).rev() {
        let tail = &prior[prior.len() - overlap..];
        let head = &incoming[..overlap];
        if tail
            .iter()
            .zip(head.iter())
            .all(|(a, b)| a.same_exchange(b))
        {
            return &incoming[overlap..];
        }
    }

    incoming
}

/// Buffers one in-flight assistant turn for a session
pub struct SessionAccumulator {
    store: Arc<dyn SessionStore>,
    session_id: String,
    model: String,
    buffer: String,
}

impl SessionAccumulator {
    pub fn new(store: Arc<dyn SessionStore>, session_id: String, model: String) -> Self {
        Self {
            store,
            session_id,
            model,
            buffer: String::new(),
        }
    }

    /// Append one repaired fragment to the in-flight turn
    pub fn push(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    /// Buffered content so far
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Commit the finished turn to the store
    ///
    /// Called after the `done` frame has been delivered. Failures are
    /// reported out-of-band; the caller's stream has already completed.
    pub async fn finalize(self) {
        if self.buffer.is_empty() {
            debug!(session_id = %self.session_id, "Empty assistant turn, nothing to persist");
            return;
        }

        let mut message = ChatMessage::new(Role::Assistant, self.buffer);
        message.model = Some(self.model.clone());

        if let Err(err) = self.store.append_message(&self.session_id, &message).await {
            error!(
                session_id = %self.session_id,
                model = %self.model,
                error = %err,
                "Failed to persist assistant message"
            );
        } else {
            debug!(session_id = %self.session_id, "Assistant message persisted");
        }
    }

    /// Drop the buffer without persisting
    ///
    /// Used when the stream ends abnormally; a partial turn never reaches
    /// the session.
    pub fn discard(self) {
        debug!(
            session_id = %self.session_id,
            buffered = self.buffer.len(),
            "Discarding partial assistant turn"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::InMemorySessionStore;
    use crate::session::store::SessionStore;

    fn user(content: &str) -> ChatMessage {
        ChatMessage::new(Role::User, content)
    }

    fn assistant(content: &str) -> ChatMessage {
        ChatMessage::new(Role::Assistant, content)
    }

    // ===========================================
    // dedup_incoming
    // ===========================================

    #[test]
    fn test_dedup_identical_retry_skipped() {
        let prior = vec![user("hi")];
        let incoming = vec![user("hi")];

        assert!(dedup_incoming(&prior, &incoming).is_empty());
    }

    #[test]
    fn test_dedup_fresh_message_kept() {
        let prior = vec![user("hi"), assistant("hello")];
        let incoming = vec![user("how are you?")];

        assert_eq!(dedup_incoming(&prior, &incoming), &incoming[..]);
    }

    #[test]
    fn test_dedup_repeated_text_in_new_turn_kept() {
        // The same words sent again after the assistant replied is a new
        // turn, not a retry.
        let prior = vec![user("hi"), assistant("hello")];
        let incoming = vec![user("hi")];

        assert_eq!(dedup_incoming(&prior, &incoming).len(), 1);
    }

    #[test]
    fn test_dedup_multi_message_retry() {
        let prior = vec![user("a"), user("b")];
        let incoming = vec![user("a"), user("b")];

        assert!(dedup_incoming(&prior, &incoming).is_empty());
    }

    #[test]
    fn test_dedup_partial_overlap() {
        let prior = vec![user("a"), user("b")];
        let incoming = vec![user("b"), user("c")];

        let fresh = dedup_incoming(&prior, &incoming);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].content, "c");
    }

    #[test]
    fn test_dedup_empty_history() {
        let incoming = vec![user("hi")];
        assert_eq!(dedup_incoming(&[], &incoming).len(), 1);
    }

    // ===========================================
    // SessionAccumulator
    // ===========================================

    #[tokio::test]
    async fn test_finalize_persists_full_buffer() {
        let store = Arc::new(InMemorySessionStore::new());
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        let mut acc =
            SessionAccumulator::new(store.clone(), record.id.clone(), "gpt-4".to_string());
        acc.push("Hello");
        acc.push(" world");
        acc.finalize().await;

        let messages = store.list_messages(&record.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "Hello world");
        assert_eq!(messages[0].model.as_deref(), Some("gpt-4"));
    }

    #[tokio::test]
    async fn test_finalize_updates_session_metadata() {
        let store = Arc::new(InMemorySessionStore::new());
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        let mut acc =
            SessionAccumulator::new(store.clone(), record.id.clone(), "gpt-4".to_string());
        acc.push("The answer is forty-two.");
        acc.finalize().await;

        let updated = store.get_session(&record.id).await.unwrap().unwrap();
        assert_eq!(updated.message_count, 1);
        assert_eq!(updated.preview, "The answer is forty-two.");
        assert!(updated.last_updated >= record.last_updated);
    }

    #[tokio::test]
    async fn test_empty_buffer_persists_nothing() {
        let store = Arc::new(InMemorySessionStore::new());
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        let acc = SessionAccumulator::new(store.clone(), record.id.clone(), "gpt-4".to_string());
        acc.finalize().await;

        assert!(store.list_messages(&record.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discard_persists_nothing() {
        let store = Arc::new(InMemorySessionStore::new());
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        let mut acc =
            SessionAccumulator::new(store.clone(), record.id.clone(), "gpt-4".to_string());
        acc.push("partial answer that never finis");
        acc.discard();

        assert!(store.list_messages(&record.id, None).await.unwrap().is_empty());
        let record = store.get_session(&record.id).await.unwrap().unwrap();
        assert_eq!(record.message_count, 0);
    }

    #[tokio::test]
    async fn test_finalize_against_missing_session_only_logs() {
        let store = Arc::new(InMemorySessionStore::new());

        let mut acc =
            SessionAccumulator::new(store, "gone".to_string(), "gpt-4".to_string());
        acc.push("content");
        // Must not panic; the error is reported out-of-band.
        acc.finalize().await;
    }
}
