//! Redis session store
//!
//! Layout: one JSON record per session, one list of JSON messages, and a
//! sorted set indexing sessions by last-update time for listing. All writes
//! go through `save_record` so metadata and index stay in step.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::store::{SessionRecord, SessionStore};
use crate::api::{ChatMessage, Role};
use crate::error::{AppError, AppResult};

/// Redis key layout
mod keys {
    /// Session metadata record
    pub fn session(id: &str) -> String {
        format!("prism:chat_session:{id}")
    }

    /// Message list for a session
    pub fn messages(id: &str) -> String {
        format!("prism:chat_session:{id}:messages")
    }

    /// Sorted set of session ids scored by last-update time
    pub const INDEX: &str = "prism:chat_sessions";
}

/// Redis-backed session store
pub struct RedisSessionStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    async fn load_record(&self, id: &str) -> AppResult<Option<SessionRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(keys::session(id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_record(&self, record: &SessionRecord) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(record)?;
        let _: () = conn.set(keys::session(&record.id), raw).await?;
        let _: () = conn
            .zadd(keys::INDEX, &record.id, record.last_updated.timestamp_millis())
            .await?;
        Ok(())
    }

    async fn require_record(&self, id: &str) -> AppResult<SessionRecord> {
        self.load_record(id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn is_available(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }

    #[instrument(skip(self))]
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
        self.save_record(&record).await?;
        debug!(session_id = %record.id, "Session created");
        Ok(record)
    }

    async fn get_session(&self, id: &str) -> AppResult<Option<SessionRecord>> {
        self.load_record(id).await
    }

    async fn list_sessions(&self, limit: usize, offset: usize) -> AppResult<Vec<SessionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrevrange(keys::INDEX, offset as isize, (offset + limit - 1) as isize)
            .await?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load_record(&id).await? {
                sessions.push(record);
            }
        }
        Ok(sessions)
    }

    #[instrument(skip(self, message), fields(role = message.role.as_str()))]
    async fn append_message(&self, id: &str, message: &ChatMessage) -> AppResult<ChatMessage> {
        let mut record = self.require_record(id).await?;

        let mut stored = message.clone();
        if stored.id.is_none() {
            stored.id = Some(Uuid::new_v4().to_string());
        }
        if stored.timestamp.is_none() {
            stored.timestamp = Some(Utc::now());
        }

        let mut conn = self.conn.clone();
        let _: () = conn
            .rpush(keys::messages(id), serde_json::to_string(&stored)?)
            .await?;

        record.message_count += 1;
        record.last_updated = Utc::now();
        if stored.role == Role::Assistant {
            record.preview = SessionRecord::preview_of(&stored.content);
        }
        self.save_record(&record).await?;

        Ok(stored)
    }

    async fn list_messages(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<ChatMessage>> {
        self.require_record(id).await?;

        let mut conn = self.conn.clone();
        let raw: Vec<String> = match limit {
            Some(n) => conn.lrange(keys::messages(id), -(n as isize), -1).await?,
            None => conn.lrange(keys::messages(id), 0, -1).await?,
        };

        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            messages.push(serde_json::from_str(&entry)?);
        }
        Ok(messages)
    }

    async fn update_metadata(
        &self,
        id: &str,
        title: Option<&str>,
        model_id: Option<&str>,
    ) -> AppResult<()> {
        let mut record = self.require_record(id).await?;

        if let Some(title) = title {
            record.title = title.to_string();
        }
        if let Some(model_id) = model_id {
            record.model_id = model_id.to_string();
        }
        record.last_updated = Utc::now();
        self.save_record(&record).await
    }

    async fn clear_messages(&self, id: &str) -> AppResult<()> {
        let mut record = self.require_record(id).await?;

        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::messages(id)).await?;

        record.message_count = 0;
        record.preview = String::new();
        self.save_record(&record).await
    }

    async fn delete_session(&self, id: &str) -> AppResult<()> {
        self.require_record(id).await?;

        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::messages(id)).await?;
        let _: () = conn.del(keys::session(id)).await?;
        let _: () = conn.zrem(keys::INDEX, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(keys::session("abc"), "prism:chat_session:abc");
        assert_eq!(keys::messages("abc"), "prism:chat_session:abc:messages");
        assert_eq!(keys::INDEX, "prism:chat_sessions");
    }
}
