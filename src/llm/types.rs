// src/llm/types.rs
// Chat message and completion request types (OpenAI-compatible wire format)

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation, oldest first in any transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters forwarded upstream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 0.9,
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a streaming request with the given sampling parameters
    pub fn streaming(model: impl Into<String>, messages: Vec<Message>, sampling: Sampling) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            top_p: sampling.top_p,
            stream: true,
        }
    }
}

/// Streaming chunk from the completions endpoint (only the fields we read)
#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkError {
    #[serde(default)]
    pub message: String,
    /// Numeric HTTP-style code or a provider string such as `rate_limit_exceeded`
    #[serde(default)]
    pub code: Option<Value>,
}

impl ChunkError {
    /// `code` when it is a plausible HTTP error status
    pub fn status(&self) -> Option<u16> {
        self.code
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .filter(|c| (400..600).contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_streaming_request_body() {
        let req = CompletionRequest::streaming("llama", vec![Message::user("hi")], Sampling::default());
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "llama");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chunk_tolerates_missing_fields() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"id":"x","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
        assert!(chunk.error.is_none());
    }

    #[test]
    fn test_chunk_error_status_only_for_http_codes() {
        let numeric: CompletionChunk =
            serde_json::from_str(r#"{"error":{"message":"busy","code":503}}"#).unwrap();
        assert_eq!(numeric.error.unwrap().status(), Some(503));

        let named: CompletionChunk =
            serde_json::from_str(r#"{"error":{"message":"slow down","code":"rate_limit_exceeded"}}"#).unwrap();
        assert_eq!(named.error.unwrap().status(), None);
    }
}
