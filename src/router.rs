//! Completion routing
//!
//! Maps a logical model id onto one vendor adapter through a fixed, ordered
//! prefix table, then drives the matching backend client. The alias retry
//! lives here as an explicit bounded loop: one direct attempt, at most one
//! aliased attempt, never more.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::{info, instrument, warn};

use crate::adapters::{
    AnthropicAdapter, BackendKind, CohereAdapter, Completion, Delta, GenerationParams,
    LlamaAdapter, MistralAdapter, OpenAiAdapter, TitanAdapter, VendorAdapter,
};
use crate::alias::AliasResolver;
use crate::api::{ChatMessage, ModelInfo};
use crate::backend::{InferenceBackend, OpenAiBackend, RawEventStream};
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Stream of adapter-neutral deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = AppResult<Delta>> + Send>>;

/// Ordered model-prefix routing table, longest prefixes first
///
/// First match wins. Model ids matching no entry fall back to the GPT-style
/// adapter rather than failing — deliberate leniency toward callers passing
/// unrecognized but OpenAI-compatible ids (flagged for product review, see
/// DESIGN.md).
static ROUTE_TABLE: &[(&str, &'static dyn VendorAdapter)] = &[
    ("anthropic.claude", &AnthropicAdapter),
    ("amazon.titan", &TitanAdapter),
    ("meta.llama", &LlamaAdapter),
    ("mistral.", &MistralAdapter),
    ("cohere.", &CohereAdapter),
    ("azure-", &OpenAiAdapter),
    ("gpt-", &OpenAiAdapter),
    ("o1", &OpenAiAdapter),
];

/// Fallback adapter for unregistered prefixes
static FALLBACK_ADAPTER: &dyn VendorAdapter = &OpenAiAdapter;

/// Select the adapter for a model id
pub fn adapter_for(model: &str) -> &'static dyn VendorAdapter {
    ROUTE_TABLE
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, adapter)| *adapter)
        .unwrap_or(FALLBACK_ADAPTER)
}

/// Routes completion requests to backend clients via vendor adapters
pub struct CompletionRouter {
    openai: OpenAiBackend,
    inference: InferenceBackend,
    resolver: AliasResolver,
}

impl CompletionRouter {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            openai: OpenAiBackend::new(client.clone(), config),
            inference: InferenceBackend::new(client, config),
            resolver: AliasResolver::new(),
        }
    }

    /// Non-streaming completion
    #[instrument(skip(self, messages, params), fields(model = %model))]
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
        alias_override: Option<&str>,
    ) -> AppResult<Completion> {
        let adapter = adapter_for(model);
        info!(adapter = adapter.name(), "Routing completion");

        let body = adapter.format_request(model, messages, params);
        let raw = match adapter.backend() {
            BackendKind::OpenAi => self.openai.chat(&body).await?,
            BackendKind::Inference => {
                self.invoke_with_alias_retry(model, alias_override, &body)
                    .await?
            }
        };

        adapter.parse_response(&raw).map_err(|err| AppError::Decode {
            model: model.to_string(),
            detail: err.to_string(),
        })
    }

    /// Streaming completion
    ///
    /// Opens the native stream (retrying once through the alias resolver if
    /// needed) and reduces its events to deltas through the adapter.
    #[instrument(skip(self, messages, params), fields(model = %model))]
    pub async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
        alias_override: Option<&str>,
    ) -> AppResult<DeltaStream> {
        let adapter = adapter_for(model);
        info!(adapter = adapter.name(), "Routing streaming completion");

        let body = adapter.format_request(model, messages, params);
        let raw = match adapter.backend() {
            BackendKind::OpenAi => self.openai.chat_stream(&body).await?,
            BackendKind::Inference => {
                self.open_stream_with_alias_retry(model, alias_override, &body)
                    .await?
            }
        };

        let deltas = raw.filter_map(move |event| async move {
            match event {
                Ok(value) => adapter.parse_chunk(&value).map(Ok),
                Err(err) => Some(Err(err)),
            }
        });

        Ok(Box::pin(deltas))
    }

    /// Aggregate model listing across both backends
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        let mut models = self.openai.list_models();
        models.extend(self.inference.list_models().await);
        models
    }

    /// Invoke with at most one aliased retry
    ///
    /// First attempt uses the resolved id (override, mapping, or the model
    /// itself). Only an alias-required rejection of a non-aliased attempt
    /// is retried, and only when the mapping offers a different id. A
    /// failure of the retry is terminal.
    async fn invoke_with_alias_retry(
        &self,
        model: &str,
        alias_override: Option<&str>,
        body: &serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let first_id = self.resolver.resolve(model, alias_override);

        match self.inference.invoke(model, first_id, body).await {
            Ok(raw) => Ok(raw),
            Err(err) if err.is_alias_required() => {
                match self.retry_alias(first_id, model) {
                    Some(alias) => {
                        warn!(model = %model, alias = %alias, "Retrying with inference-profile alias");
                        metrics::counter!("prism_alias_retries_total", "model" => model.to_string())
                            .increment(1);
                        self.inference
                            .invoke(model, alias, body)
                            .await
                            .map_err(|retry_err| AppError::AliasRetryFailed {
                                model: model.to_string(),
                                alias: alias.to_string(),
                                detail: retry_err.to_string(),
                            })
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Stream-open variant of the bounded alias retry
    ///
    /// The service rejects at request time, so the retry can only fire
    /// before any event has been delivered.
    async fn open_stream_with_alias_retry(
        &self,
        model: &str,
        alias_override: Option<&str>,
        body: &serde_json::Value,
    ) -> AppResult<RawEventStream> {
        let first_id = self.resolver.resolve(model, alias_override);

        match self.inference.invoke_stream(model, first_id, body).await {
            Ok(stream) => Ok(stream),
            Err(err) if err.is_alias_required() => {
                match self.retry_alias(first_id, model) {
                    Some(alias) => {
                        warn!(model = %model, alias = %alias, "Retrying stream with inference-profile alias");
                        metrics::counter!("prism_alias_retries_total", "model" => model.to_string())
                            .increment(1);
                        self.inference
                            .invoke_stream(model, alias, body)
                            .await
                            .map_err(|retry_err| AppError::AliasRetryFailed {
                                model: model.to_string(),
                                alias: alias.to_string(),
                                detail: retry_err.to_string(),
                            })
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// The alias to retry with, if any
    ///
    /// `None` both when no mapping exists and when the failing attempt
    /// already used the mapped alias — either way the error is terminal.
    fn retry_alias(&self, attempted_id: &str, model: &str) -> Option<&'static str> {
        self.resolver
            .mapped_alias(model)
            .filter(|alias| *alias != attempted_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_family_routes_to_its_adapter() {
        let cases = [
            ("gpt-4", "openai"),
            ("gpt-35-turbo", "openai"),
            ("o1-preview", "openai"),
            ("azure-custom", "openai"),
            ("anthropic.claude-3-sonnet-20240229-v1:0", "anthropic"),
            ("amazon.titan-text-express-v1", "titan"),
            ("meta.llama3-3-70b-instruct-v1:0", "llama"),
            ("mistral.mistral-7b-instruct-v0:2", "mistral"),
            ("cohere.command-r-v1:0", "cohere"),
        ];

        for (model, expected) in cases {
            assert_eq!(adapter_for(model).name(), expected, "{model}");
        }
    }

    #[test]
    fn test_unregistered_prefix_falls_back_to_openai() {
        assert_eq!(adapter_for("some-unknown-model").name(), "openai");
        assert_eq!(adapter_for("").name(), "openai");
    }

    #[test]
    fn test_table_prefixes_ordered_longest_first() {
        // A shorter prefix that also prefixes a longer one would shadow it;
        // the table must keep longer entries first.
        for (i, (earlier, _)) in ROUTE_TABLE.iter().enumerate() {
            for (later, _) in &ROUTE_TABLE[i + 1..] {
                assert!(!later.starts_with(earlier), "{earlier} shadows {later}");
            }
        }
    }

    #[test]
    fn test_inference_families_use_inference_backend() {
        for model in [
            "anthropic.claude-3-haiku-20240307-v1:0",
            "amazon.titan-text-lite-v1",
            "meta.llama3-3-8b-instruct-v1:0",
            "mistral.mistral-7b-instruct-v0:2",
            "cohere.command-r-v1:0",
        ] {
            assert_eq!(adapter_for(model).backend(), BackendKind::Inference);
        }
        assert_eq!(adapter_for("gpt-4").backend(), BackendKind::OpenAi);
    }
}
