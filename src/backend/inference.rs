//! Managed inference service client
//!
//! Invokes models behind the managed inference service:
//! `POST /model/{id}/invoke` for one-shot completions and
//! `POST /model/{id}/invoke-with-response-stream` for streaming, which
//! frames events as newline-delimited JSON. Error bodies are classified
//! here into the alias-required / access-denied / upstream taxonomy; the
//! router decides what to do about them.

use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::RawEventStream;
use crate::alias::{access_denied_hint, is_access_denied_error, is_alias_required_error};
use crate::api::ModelInfo;
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Model-family prefixes exposed through the listing endpoint
const LISTED_FAMILIES: &[&str] = &[
    "anthropic.claude",
    "amazon.titan-text",
    "meta.llama",
    "mistral.",
    "cohere.",
];

/// Client for the managed inference service
pub struct InferenceBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    first_chunk_timeout: Duration,
    /// Cached foundation-model catalog. One writer at a time; a refresh
    /// overwrites the whole list and stale reads during a refresh are fine.
    models_cache: RwLock<Option<Vec<ModelInfo>>>,
}

impl InferenceBackend {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.inference_api_url.trim_end_matches('/').to_string(),
            api_key: config.inference_api_key.clone(),
            first_chunk_timeout: Duration::from_secs(config.first_chunk_timeout_secs),
            models_cache: RwLock::new(None),
        }
    }

    fn request(&self, url: String, body: &Value) -> reqwest::RequestBuilder {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request
    }

    /// Classify a non-success response body against the error taxonomy
    ///
    /// `model` is the logical id, not the concrete (possibly aliased) id,
    /// so error messages and hints stay meaningful to the caller.
    fn classify_error(model: &str, status: reqwest::StatusCode, body: &str) -> AppError {
        if is_alias_required_error(body) {
            AppError::AliasRequired(model.to_string())
        } else if is_access_denied_error(body) {
            AppError::AccessDenied {
                model: model.to_string(),
                hint: access_denied_hint(model),
            }
        } else {
            AppError::Upstream(format!("inference service returned {status}: {body}"))
        }
    }

    /// One-shot model invocation
    #[instrument(skip(self, body), fields(model = %model, concrete_id = %concrete_id))]
    pub async fn invoke(&self, model: &str, concrete_id: &str, body: &Value) -> AppResult<Value> {
        let url = format!(
            "{}/model/{}/invoke",
            self.base_url,
            encode_model_id(concrete_id)
        );
        let response = self.request(url, body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Inference service rejected request");
            return Err(Self::classify_error(model, status, &text));
        }

        Ok(response.json().await?)
    }

    /// Streaming model invocation
    ///
    /// The service frames stream events as one JSON document per line.
    /// Rejections happen at request time, so the alias retry (done by the
    /// router) only ever re-opens a stream that has delivered nothing.
    pub async fn invoke_stream(
        &self,
        model: &str,
        concrete_id: &str,
        body: &Value,
    ) -> AppResult<RawEventStream> {
        let url = format!(
            "{}/model/{}/invoke-with-response-stream",
            self.base_url,
            encode_model_id(concrete_id)
        );
        let response = self.request(url, body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(model, status, &text));
        }

        let model = model.to_string();
        let first_chunk_timeout = self.first_chunk_timeout;
        let events = stream! {
            let mut bytes = response.bytes_stream();
            let mut pending = String::new();
            let mut first = true;

            loop {
                let next = if first {
                    match tokio::time::timeout(first_chunk_timeout, bytes.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            yield Err(AppError::Timeout(format!(
                                "no stream data from {model} within {}s",
                                first_chunk_timeout.as_secs()
                            )));
                            return;
                        }
                    }
                } else {
                    bytes.next().await
                };
                first = false;

                match next {
                    Some(Ok(chunk)) => {
                        pending.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(pos) = pending.find('\n') {
                            let line: String = pending.drain(..=pos).collect();
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<Value>(line) {
                                Ok(value) => yield Ok(value),
                                Err(err) => {
                                    debug!(error = %err, "Skipping unparseable stream line");
                                }
                            }
                        }
                    }
                    Some(Err(err)) => {
                        yield Err(err.into());
                        return;
                    }
                    None => {
                        // Trailing event without a final newline
                        let line = pending.trim();
                        if !line.is_empty() {
                            if let Ok(value) = serde_json::from_str::<Value>(line) {
                                yield Ok(value);
                            }
                        }
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }

    /// List available foundation models, via the cache when warm
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        if let Some(cached) = self.models_cache.read().await.as_ref() {
            debug!("Using cached inference model catalog");
            return cached.clone();
        }

        let models = match self.fetch_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                warn!("Inference catalog empty, using fallback models");
                fallback_models()
            }
            Err(err) => {
                warn!(error = %err, "Failed to list inference models, using fallback");
                fallback_models()
            }
        };

        // Overwrite monotonically; concurrent readers may still see the
        // previous value until this completes.
        *self.models_cache.write().await = Some(models.clone());
        models
    }

    async fn fetch_models(&self) -> AppResult<Vec<ModelInfo>> {
        let mut request = self.client.get(format!("{}/foundation-models", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "inference service returned {status} listing models"
            )));
        }

        let catalog: Value = response.json().await?;
        let summaries = catalog["modelSummaries"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let models = summaries
            .iter()
            .filter_map(|summary| {
                let id = summary["modelId"].as_str()?;
                if !LISTED_FAMILIES.iter().any(|family| id.starts_with(family)) {
                    return None;
                }
                Some(ModelInfo {
                    id: id.to_string(),
                    provider: "inference".to_string(),
                    name: summary["modelName"].as_str().unwrap_or(id).to_string(),
                })
            })
            .collect();

        Ok(models)
    }
}

/// Static catalog used when the listing call fails
fn fallback_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            provider: "inference".to_string(),
            name: "Claude 3 Sonnet".to_string(),
        },
        ModelInfo {
            id: "amazon.titan-text-express-v1".to_string(),
            provider: "inference".to_string(),
            name: "Titan Text Express".to_string(),
        },
        ModelInfo {
            id: "mistral.mistral-7b-instruct-v0:2".to_string(),
            provider: "inference".to_string(),
            name: "Mistral 7B Instruct".to_string(),
        },
    ]
}

/// Percent-encode a model id for use as a URL path segment
///
/// Profile ARNs contain `:` and `/`, which cannot appear raw in the path.
fn encode_model_id(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain_model_id() {
        assert_eq!(
            encode_model_id("amazon.titan-text-express-v1"),
            "amazon.titan-text-express-v1"
        );
    }

    #[test]
    fn test_encode_arn_escapes_separators() {
        let encoded = encode_model_id("arn:aws:bedrock:us-east-1:0:inference-profile/us.m");
        assert!(!encoded.contains(':'));
        assert!(!encoded.contains('/'));
        assert!(encoded.contains("%3A"));
        assert!(encoded.contains("%2F"));
    }

    #[test]
    fn test_classify_alias_required() {
        let err = InferenceBackend::classify_error(
            "meta.llama3-3-70b-instruct-v1:0",
            reqwest::StatusCode::BAD_REQUEST,
            "ValidationException: Invocation with on-demand throughput isn't supported.",
        );
        assert!(err.is_alias_required());
    }

    #[test]
    fn test_classify_access_denied() {
        let err = InferenceBackend::classify_error(
            "anthropic.claude-3-opus-20240229-v1:0",
            reqwest::StatusCode::FORBIDDEN,
            "AccessDeniedException: no model access",
        );

        match err {
            AppError::AccessDenied { model, hint } => {
                assert_eq!(model, "anthropic.claude-3-opus-20240229-v1:0");
                assert!(hint.contains("inference profile"));
            }
            other => panic!("expected AccessDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_other_is_upstream() {
        let err = InferenceBackend::classify_error(
            "amazon.titan-text-express-v1",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "ServiceUnavailableException",
        );
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_listed_families_cover_all_adapters() {
        for model in [
            "anthropic.claude-3-haiku-20240307-v1:0",
            "amazon.titan-text-lite-v1",
            "meta.llama3-3-8b-instruct-v1:0",
            "mistral.mistral-7b-instruct-v0:2",
            "cohere.command-r-v1:0",
        ] {
            assert!(
                LISTED_FAMILIES.iter().any(|f| model.starts_with(f)),
                "{model} not covered"
            );
        }
    }
}
