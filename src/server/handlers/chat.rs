use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::Stream;
use tokio_stream::StreamExt;

use crate::core::errors::ApiError;
use crate::rag::chain::STREAM_ERROR_MESSAGE;
use crate::rag::ChainEvent;
use crate::server::protocol::{ChatRequest, ChatResponse};
use crate::state::AppState;

pub const ERROR_EVENT: &str = "error";
pub const DONE_EVENT: &str = "done";

/// Streams the answer as server-sent events.
///
/// Content fragments use the default event type so clients that only read
/// `data:` lines keep working; failures arrive as an `error` event whose data
/// still begins with `Error: `, and a successful answer ends with `done`.
pub async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let question = validate_question(request.question)?;

    let events = state
        .chain
        .stream(question)
        .map(|event| Ok::<_, Infallible>(to_sse_event(event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Answers in a single JSON response.
pub async fn complete_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let question = validate_question(request.question)?;

    match state.chain.invoke(&question).await {
        Ok(answer) => Ok(Json(ChatResponse { answer })),
        Err(err) => {
            tracing::error!("RAG chain invoke failed: {:?}", err);
            Err(ApiError::Internal(
                STREAM_ERROR_MESSAGE
                    .trim_start_matches("Error: ")
                    .to_string(),
            ))
        }
    }
}

fn validate_question(question: String) -> Result<String, ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::BadRequest("question cannot be empty".to_string()));
    }
    Ok(question)
}

pub fn to_sse_event(event: ChainEvent) -> Event {
    match event {
        ChainEvent::Content(text) => Event::default().data(normalize_newlines(&text)),
        ChainEvent::Error(message) => Event::default()
            .event(ERROR_EVENT)
            .data(normalize_newlines(&message)),
        ChainEvent::Done => Event::default().event(DONE_EVENT).data(""),
    }
}

// SSE field values may not contain carriage returns.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
