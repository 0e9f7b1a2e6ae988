//! Configuration management for Prism
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Redis connection URL (session store)
    pub redis_url: String,

    /// GPT-style API base URL
    pub openai_api_url: String,
    /// GPT-style API key
    pub openai_api_key: Option<String>,
    /// Deployed GPT-style model ids, comma-separated in the environment
    pub openai_deployed_models: Vec<String>,

    /// Managed inference service base URL
    pub inference_api_url: String,
    /// Managed inference service API key
    pub inference_api_key: Option<String>,

    /// Overall outbound request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Time allowed for a stream's first chunk (seconds)
    pub first_chunk_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("PRISM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PRISM_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PRISM_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_deployed_models: env::var("OPENAI_DEPLOYED_MODELS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),

            inference_api_url: env::var("INFERENCE_API_URL")
                .context("INFERENCE_API_URL must be set")?,
            inference_api_key: env::var("INFERENCE_API_KEY").ok(),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,
            first_chunk_timeout_secs: env::var("FIRST_CHUNK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid FIRST_CHUNK_TIMEOUT_SECS")?,
        })
    }
}
