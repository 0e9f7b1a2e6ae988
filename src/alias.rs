//! Inference-profile alias resolution
//!
//! Some inference-service models reject on-demand invocation and must be
//! addressed through an inference-profile alias instead. This module owns
//! the static model-to-profile mapping, the resolution order (explicit
//! override, then mapping, then pass-through), and the classification of the
//! backend errors that trigger the single aliased retry.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Default mapping of models to inference-profile aliases
///
/// Models listed here cannot be invoked by their plain id in this region;
/// the profile ARN stands in for the model id on retry.
static DEFAULT_INFERENCE_PROFILES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "anthropic.claude-3-haiku-20240307-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-haiku-20240307-v1:0",
        ),
        (
            "anthropic.claude-3-opus-20240229-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-opus-20240229-v1:0",
        ),
        (
            "anthropic.claude-3-sonnet-20240229-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-sonnet-20240229-v1:0",
        ),
        (
            "anthropic.claude-3-5-haiku-20241022-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-5-haiku-20241022-v1:0",
        ),
        (
            "anthropic.claude-3-5-sonnet-20240620-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-5-sonnet-20240620-v1:0",
        ),
        (
            "anthropic.claude-3-5-sonnet-20241022-v2:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-5-sonnet-20241022-v2:0",
        ),
        (
            "anthropic.claude-3-7-sonnet-20250219-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.anthropic.claude-3-7-sonnet-20250219-v1:0",
        ),
        (
            "meta.llama3-3-70b-instruct-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.meta.llama3-3-70b-instruct-v1:0",
        ),
        (
            "meta.llama3-3-8b-instruct-v1:0",
            "arn:aws:bedrock:us-east-1:000000000000:inference-profile/us.meta.llama3-3-8b-instruct-v1:0",
        ),
    ])
});

/// Resolves logical model ids to the concrete id the backend accepts
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasResolver;

impl AliasResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the id to use for the first invocation attempt
    ///
    /// An explicit override is used verbatim; otherwise the static mapping
    /// applies; otherwise the model id passes through unchanged.
    pub fn resolve<'a>(&self, model_id: &'a str, explicit_alias: Option<&'a str>) -> &'a str {
        if let Some(alias) = explicit_alias {
            return alias;
        }
        self.mapped_alias(model_id).unwrap_or(model_id)
    }

    /// Look up the static mapping only
    pub fn mapped_alias(&self, model_id: &str) -> Option<&'static str> {
        DEFAULT_INFERENCE_PROFILES.get(model_id).copied()
    }
}

/// Whether a backend error message is in the alias-required class
///
/// The backend does not give this failure a dedicated code; it surfaces as a
/// validation error mentioning inference profiles or on-demand support.
pub fn is_alias_required_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("inference profile") || lower.contains("isn't supported")
}

/// Whether a backend error message reports missing model access
pub fn is_access_denied_error(message: &str) -> bool {
    message.contains("AccessDeniedException")
}

/// Hint attached to access-denied errors
///
/// Claude-style and Llama-style families are the ones known to need an
/// inference profile, so denial there usually means a profile problem
/// rather than a permissions problem.
pub fn access_denied_hint(model_id: &str) -> String {
    if model_id.starts_with("anthropic.claude") || model_id.starts_with("meta.llama") {
        "This model may require an inference profile. Please check your permissions \
         and ensure the correct inference profile is configured."
            .to_string()
    } else {
        "Please check your model access permissions.".to_string()
    }
}
