//! Models endpoint
//!
//! Lists models available across both backends.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{api::ModelsResponse, AppState};

/// List all available models
///
/// Merges the configured GPT-style deployments with the inference service's
/// foundation-model catalog (served from the backend client's cache when warm).
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state.router.list_models().await;
    Json(ModelsResponse { models })
}
