//! In-memory session store for tests
//!
//! Mirrors the Redis store's observable behavior (metadata maintenance,
//! ordering, not-found errors) without a running Redis. Only compiled for
//! tests and the `test-utils` feature.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::store::{SessionRecord, SessionStore};
use crate::api::{ChatMessage, Role};
use crate::error::{AppError, AppResult};

#[derive(Debug)]
struct Entry {
    record: SessionRecord,
    messages: Vec<ChatMessage>,
}

/// Hash-map backed session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn is_available(&self) -> bool {
        true
    }

    async fn create_session(
        &self,
        id: Option<&str>,
        title: &str,
        model_id: &str,
    ) -> AppResult<SessionRecord> {
        let now = Utc::now();
        let record = SessionRecord {
            id: id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: title.to_string(),
            created_at: now,
            last_updated: now,
            model_id: model_id.to_string(),
            message_count: 0,
            preview: String::new(),
        };

        self.sessions.lock().unwrap().insert(
            record.id.clone(),
            Entry {
                record: record.clone(),
                messages: Vec::new(),
            },
        );
        Ok(record)
    }

    async fn get_session(&self, id: &str) -> AppResult<Option<SessionRecord>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(id)
            .map(|e| e.record.clone()))
    }

    async fn list_sessions(&self, limit: usize, offset: usize) -> AppResult<Vec<SessionRecord>> {
        let sessions = self.sessions.lock().unwrap();
        let mut records: Vec<SessionRecord> =
            sessions.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn append_message(&self, id: &str, message: &ChatMessage) -> AppResult<ChatMessage> {
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;

        let mut stored = message.clone();
        if stored.id.is_none() {
            stored.id = Some(Uuid::new_v4().to_string());
        }
        if stored.timestamp.is_none() {
            stored.timestamp = Some(Utc::now());
        }

        entry.messages.push(stored.clone());
        entry.record.message_count += 1;
        entry.record.last_updated = Utc::now();
        if stored.role == Role::Assistant {
            entry.record.preview = SessionRecord::preview_of(&stored.content);
        }

        Ok(stored)
    }

    async fn list_messages(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<ChatMessage>> {
        let sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .get(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;

        let messages = &entry.messages;
        let start = limit
            .map(|n| messages.len().saturating_sub(n))
            .unwrap_or(0);
        Ok(messages[start..].to_vec())
    }

    async fn update_metadata(
        &self,
        id: &str,
        title: Option<&str>,
        model_id: Option<&str>,
    ) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;

        if let Some(title) = title {
            entry.record.title = title.to_string();
        }
        if let Some(model_id) = model_id {
            entry.record.model_id = model_id.to_string();
        }
        entry.record.last_updated = Utc::now();
        Ok(())
    }

    async fn clear_messages(&self, id: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;

        entry.messages.clear();
        entry.record.message_count = 0;
        entry.record.preview = String::new();
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .remove(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemorySessionStore::new();
        let record = store
            .create_session(None, "New Chat", "gpt-4")
            .await
            .unwrap();

        let fetched = store.get_session(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "New Chat");
        assert_eq!(fetched.message_count, 0);
    }

    #[tokio::test]
    async fn test_append_updates_metadata() {
        let store = InMemorySessionStore::new();
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        store
            .append_message(&record.id, &ChatMessage::new(Role::User, "hi"))
            .await
            .unwrap();
        store
            .append_message(
                &record.id,
                &ChatMessage::new(Role::Assistant, "hello there friend"),
            )
            .await
            .unwrap();

        let updated = store.get_session(&record.id).await.unwrap().unwrap();
        assert_eq!(updated.message_count, 2);
        assert_eq!(updated.preview, "hello there friend");
    }

    #[tokio::test]
    async fn test_append_assigns_id_and_timestamp() {
        let store = InMemorySessionStore::new();
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        let stored = store
            .append_message(&record.id, &ChatMessage::new(Role::User, "hi"))
            .await
            .unwrap();

        assert!(stored.id.is_some());
        assert!(stored.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_list_messages_with_limit() {
        let store = InMemorySessionStore::new();
        let record = store.create_session(None, "Chat", "gpt-4").await.unwrap();

        for i in 0..5 {
            store
                .append_message(&record.id, &ChatMessage::new(Role::User, format!("m{i}")))
                .await
                .unwrap();
        }

        let last_two = store.list_messages(&record.id, Some(2)).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].content, "m3");
        assert_eq!(last_two[1].content, "m4");
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store
            .append_message("nope", &ChatMessage::new(Role::User, "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SessionNotFound(_)));
    }
}
