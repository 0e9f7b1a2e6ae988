//! Chat completion endpoints
//!
//! `/api/chat` for one-shot completions, `/api/chat/stream` for the SSE
//! protocol. Both share the session pre-phase: resolve or create the
//! session, merge stored history with the incoming messages (deduplicating
//! retries), and append the novel user turns before generation starts.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    adapters::GenerationParams,
    api::{ChatChoice, ChatMessage, ChatResponse, CompletionRequest, Role},
    error::{AppError, AppResult},
    prompt,
    routes::metrics::record_request,
    session::{dedup_incoming, SessionAccumulator},
    streaming::{normalize, SseFrame},
    AppState,
};

/// Conversation assembled by the session pre-phase
struct ResolvedConversation {
    /// Stored history plus the novel incoming messages, in order
    messages: Vec<ChatMessage>,
    /// Session the exchange belongs to, when persistence is on
    session_id: Option<String>,
    /// Accumulator for the assistant turn, when persistence is on
    accumulator: Option<SessionAccumulator>,
}

/// Resolve the effective conversation for a request
///
/// Without persistence this is a passthrough. With persistence the session
/// is fetched or created, stored history is loaded, and incoming messages
/// already sitting at the tail of the history are dropped so caller retries
/// cannot duplicate turns. Novel non-system messages are appended before
/// generation; system prompts are per-request and never stored.
async fn resolve_conversation(
    state: &AppState,
    request: &CompletionRequest,
) -> AppResult<ResolvedConversation> {
    if !request.persist_to_session {
        return Ok(ResolvedConversation {
            messages: request.messages.clone(),
            session_id: None,
            accumulator: None,
        });
    }

    let store = &state.session_store;
    if !store.is_available().await {
        return Err(AppError::SessionUnavailable);
    }

    let session = match &request.session_id {
        Some(id) => match store.get_session(id).await? {
            Some(session) => session,
            None => {
                store
                    .create_session(Some(id), "New Chat", &request.model)
                    .await?
            }
        },
        None => {
            store
                .create_session(None, "New Chat", &request.model)
                .await?
        }
    };

    let prior = store.list_messages(&session.id, None).await?;
    let fresh = dedup_incoming(&prior, &request.messages);

    info!(
        session_id = %session.id,
        stored = prior.len(),
        fresh = fresh.len(),
        "Conversation resolved from session"
    );

    let mut messages = prior;
    for msg in fresh {
        if msg.role == Role::System {
            messages.push(msg.clone());
            continue;
        }
        let stored = store.append_message(&session.id, msg).await?;
        messages.push(stored);
    }

    let accumulator = SessionAccumulator::new(
        Arc::clone(store),
        session.id.clone(),
        request.model.clone(),
    );

    Ok(ResolvedConversation {
        messages,
        session_id: Some(session.id),
        accumulator: Some(accumulator),
    })
}

/// Build the prepared message list and generation parameters
fn prepare(
    request: &CompletionRequest,
    conversation: &[ChatMessage],
) -> (Vec<ChatMessage>, GenerationParams) {
    let (messages, system) = prompt::prepare_messages(
        conversation,
        request.system_prompt.as_deref(),
        &request.model,
    );

    let params = GenerationParams {
        system,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
    };

    (messages, params)
}

/// Non-streaming chat endpoint
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompletionRequest>,
) -> AppResult<Json<ChatResponse>> {
    if request.stream {
        return Err(AppError::BadRequest(
            "Use /api/chat/stream for streaming responses".to_string(),
        ));
    }
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("No messages provided".to_string()));
    }

    let start_time = Instant::now();
    let resolved = resolve_conversation(&state, &request).await?;
    let (messages, params) = prepare(&request, &resolved.messages);

    let outcome = state
        .router
        .complete(
            &request.model,
            &messages,
            &params,
            request.alias_override.as_deref(),
        )
        .await;

    let completion = match outcome {
        Ok(completion) => completion,
        Err(err) => {
            record_request("error", &request.model, start_time.elapsed().as_secs_f64());
            if let Some(acc) = resolved.accumulator {
                acc.discard();
            }
            return Err(err);
        }
    };

    // Persist the finished turn; failures are logged, not surfaced.
    if let Some(mut acc) = resolved.accumulator {
        acc.push(&completion.content);
        acc.finalize().await;
    }

    record_request("success", &request.model, start_time.elapsed().as_secs_f64());

    let mut message = ChatMessage::new(Role::Assistant, completion.content);
    message.model = Some(request.model.clone());

    Ok(Json(ChatResponse {
        id: Uuid::new_v4().to_string(),
        model: request.model,
        choices: vec![ChatChoice {
            message,
            finish_reason: completion.stop_reason,
        }],
        session_id: resolved.session_id,
    }))
}

/// Streaming chat endpoint
///
/// Always answers with an SSE stream: failures before the first delta
/// surface as a single terminal `error` frame rather than an HTTP error, so
/// callers consume one protocol either way.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompletionRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if !request.stream {
        return Err(AppError::BadRequest(
            "Use /api/chat for non-streaming responses".to_string(),
        ));
    }
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("No messages provided".to_string()));
    }

    let start_time = Instant::now();
    let frames = match open_stream(&state, &request).await {
        Ok(frames) => {
            record_request(
                "streaming",
                &request.model,
                start_time.elapsed().as_secs_f64(),
            );
            frames
        }
        Err(err) => {
            warn!(model = %request.model, error = %err, "Stream failed to open");
            record_request("error", &request.model, start_time.elapsed().as_secs_f64());
            stream::once(async move { SseFrame::error(&err) }).boxed()
        }
    };

    let events = frames.map(|frame| Ok(frame.into_event()));
    Ok(Sse::new(events))
}

/// Resolve the session, open the backend stream, and normalize it
async fn open_stream(
    state: &AppState,
    request: &CompletionRequest,
) -> AppResult<futures::stream::BoxStream<'static, SseFrame>> {
    let resolved = resolve_conversation(state, request).await?;
    let (messages, params) = prepare(request, &resolved.messages);

    let deltas = match state
        .router
        .stream(
            &request.model,
            &messages,
            &params,
            request.alias_override.as_deref(),
        )
        .await
    {
        Ok(deltas) => deltas,
        Err(err) => {
            if let Some(acc) = resolved.accumulator {
                acc.discard();
            }
            return Err(err);
        }
    };

    Ok(normalize(deltas, resolved.accumulator).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::new(Role::User, "hi")],
            model: "gpt-4".to_string(),
            stream: false,
            system_prompt: None,
            max_tokens: Some(100),
            temperature: None,
            top_p: None,
            top_k: Some(40),
            alias_override: None,
            session_id: None,
            persist_to_session: false,
        }
    }

    #[test]
    fn test_prepare_threads_parameters() {
        let request = base_request();
        let (messages, params) = prepare(&request, &request.messages);

        // Default markdown system prompt inserted for GPT-style models
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(params.max_tokens, Some(100));
        assert_eq!(params.top_k, Some(40));
        assert!(params.system.is_none());
    }

    #[test]
    fn test_prepare_claude_moves_system_out_of_band() {
        let mut request = base_request();
        request.model = "anthropic.claude-3-sonnet-20240229-v1:0".to_string();

        let (messages, params) = prepare(&request, &request.messages);

        assert!(messages.iter().all(|m| m.role != Role::System));
        assert!(params.system.is_some());
    }
}
