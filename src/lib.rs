//! Prism - Multi-backend LLM gateway
//!
//! This library provides the core functionality for the Prism gateway: one
//! uniform chat-completion surface over heterogeneous LLM backends, with
//! protocol normalization under streaming and Redis-backed chat history.

pub mod adapters;
pub mod alias;
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod prompt;
pub mod router;
pub mod routes;
pub mod session;
pub mod streaming;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::router::CompletionRouter;
pub use crate::session::{RedisSessionStore, SessionStore};

/// Application state shared across all request handlers
///
/// Constructed once at startup by the composition root and passed by
/// reference; nothing in here is a global.
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Router over the backend clients and vendor adapters
    pub router: Arc<CompletionRouter>,
    /// Redis-backed session store for chat history
    pub session_store: Arc<dyn SessionStore>,
}

impl AppState {
    /// Create a new application state
    pub async fn new(config: Config) -> Result<Self> {
        // Initialize Redis connection
        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = redis::aio::ConnectionManager::new(redis_client).await?;

        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Initialize the completion router over both backends
        let router = Arc::new(CompletionRouter::new(http_client, &config));

        // Initialize the session store
        let session_store: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(redis));

        Ok(Self {
            config,
            start_time: Instant::now(),
            router,
            session_store,
        })
    }
}
