// src/web/chat.rs
// POST /api/chat - SSE relay endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;

use crate::error::{RelayError, Result};
use crate::relay::{ChatRequest, StreamEvent};
use crate::web::state::AppState;

/// Events buffered between the relay task and the response body
const EVENT_BUFFER: usize = 16;

/// Request bodies above this size are rejected before parsing
pub const CHAT_BODY_LIMIT: usize = 64 * 1024;

/// Streaming chat endpoint.
///
/// Unparseable bodies are still answered as a stream so the widget sees
/// the same `error` then `done` sequence as any other failure.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = payload
        .map(|Json(req)| req)
        .map_err(|rejection| RelayError::Validation(rejection.body_text()));

    if matches!(&request, Ok(req) if !req.wants_stream()) {
        return complete(state, request).await;
    }

    let (tx, rx) = mpsc::channel::<StreamEvent>(EVENT_BUFFER);

    // The relay notices a dropped response through tx.closed()
    let relay = state.relay.clone();
    tokio::spawn(async move {
        relay.run(request, tx).await;
    });

    let stream = async_stream::stream! {
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(Event::default().data(event.to_json()));
        }
    };

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

/// `stream: false` - run the same relay and answer once with the full text
async fn complete(state: AppState, request: Result<ChatRequest>) -> Response {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(EVENT_BUFFER);

    let collect = async move {
        let mut content = String::new();
        let mut error = None;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Content { content: delta } => content.push_str(&delta),
                StreamEvent::Error { error: message } => error = Some(message),
                StreamEvent::Done { .. } => {}
            }
        }
        (content, error)
    };

    let (outcome, (content, error)) = tokio::join!(state.relay.run(request, tx), collect);

    match error {
        None => Json(json!({ "content": content })).into_response(),
        Some(message) => {
            let status = outcome
                .error_status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(json!({ "error": message }))).into_response()
        }
    }
}
