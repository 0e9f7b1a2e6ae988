//! Error types for Prism
//!
//! One application error enum covering the whole taxonomy: routing,
//! alias-required, access-denied, transport/timeout, and decode failures,
//! plus the usual infrastructure conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error(
        "Model {0} requires an inference profile and is not available for on-demand use. \
         Please create an inference profile and provide its alias."
    )]
    AliasRequired(String),

    #[error("Failed to use model {model} with inference profile {alias}: {detail}")]
    AliasRetryFailed {
        model: String,
        alias: String,
        detail: String,
    },

    #[error("Access denied for model {model}. {hint}")]
    AccessDenied { model: String, hint: String },

    #[error("Backend timed out: {0}")]
    Timeout(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Failed to decode response from model {model}: {detail}")]
    Decode { model: String, detail: String },

    #[error("Session store unavailable")]
    SessionUnavailable,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error belongs to the alias-required class
    ///
    /// Only this class is eligible for the single alias retry; everything
    /// else is terminal at the call site.
    pub fn is_alias_required(&self) -> bool {
        matches!(self, AppError::AliasRequired(_))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::UnknownModel(_) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_MODEL", self.to_string())
            }
            AppError::AliasRequired(_) => {
                (StatusCode::BAD_REQUEST, "ALIAS_REQUIRED", self.to_string())
            }
            AppError::AliasRetryFailed { .. } => (
                StatusCode::BAD_GATEWAY,
                "ALIAS_RETRY_FAILED",
                self.to_string(),
            ),
            AppError::AccessDenied { .. } => {
                (StatusCode::FORBIDDEN, "ACCESS_DENIED", self.to_string())
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", self.to_string()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", self.to_string()),
            AppError::Decode { .. } => (StatusCode::BAD_GATEWAY, "DECODE_ERROR", self.to_string()),
            AppError::SessionUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SESSION_UNAVAILABLE",
                self.to_string(),
            ),
            AppError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", self.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Redis(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SESSION_STORE_ERROR",
                "Session store error".to_string(),
            ),
            AppError::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Upstream service error".to_string(),
            ),
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "Invalid JSON in request".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_required_message_is_instructive() {
        let err = AppError::AliasRequired("meta.llama3-2-1b-instruct-v1:0".to_string());
        let msg = err.to_string();

        assert!(msg.contains("meta.llama3-2-1b-instruct-v1:0"));
        assert!(msg.contains("inference profile"));
        assert!(msg.contains("provide its alias"));
    }

    #[test]
    fn test_is_alias_required_classification() {
        assert!(AppError::AliasRequired("m".to_string()).is_alias_required());
        assert!(!AppError::Upstream("boom".to_string()).is_alias_required());
        assert!(!AppError::AliasRetryFailed {
            model: "m".to_string(),
            alias: "a".to_string(),
            detail: "d".to_string(),
        }
        .is_alias_required());
    }

    #[test]
    fn test_decode_error_names_the_model() {
        let err = AppError::Decode {
            model: "amazon.titan-text-express-v1".to_string(),
            detail: "missing results[0].outputText".to_string(),
        };

        assert!(err.to_string().contains("amazon.titan-text-express-v1"));
    }
}
