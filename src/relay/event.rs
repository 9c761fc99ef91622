// src/relay/event.rs
// Events written to the downstream SSE stream

use serde::{Deserialize, Serialize};

/// One `data:` frame of the relay's response.
///
/// Serialized untagged so the wire shape is exactly `{"content": ..}`,
/// `{"error": ..}` or `{"done": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content { content: String },
    Error { error: String },
    Done { done: bool },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content { content: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error { error: message.into() }
    }

    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }

    /// JSON payload for the `data:` line
    pub fn to_json(&self) -> String {
        // Serializing these variants cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"done":true}"#.to_string())
    }

    /// Full SSE frame, `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}
