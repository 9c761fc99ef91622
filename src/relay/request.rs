// src/relay/request.rs
// Validated chat request schema

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::llm::{Message, Role};

/// Longest single message accepted from a caller
pub const MAX_MESSAGE_CHARS: usize = 8000;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// `false` asks for a single JSON answer instead of an event stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, stream: None }
    }

    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    /// Check the transcript before anything goes upstream
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.messages.last() else {
            return Err(RelayError::Validation("messages must not be empty".to_string()));
        };

        if last.role != Role::User {
            return Err(RelayError::Validation(
                "the last message must come from the user".to_string(),
            ));
        }

        if last.content.trim().is_empty() {
            return Err(RelayError::Validation("the last message is empty".to_string()));
        }

        if self.messages.iter().any(|m| m.role == Role::System) {
            return Err(RelayError::Validation(
                "system messages are not accepted from clients".to_string(),
            ));
        }

        if let Some((index, _)) = self
            .messages
            .iter()
            .enumerate()
            .find(|(_, m)| m.content.chars().count() > MAX_MESSAGE_CHARS)
        {
            return Err(RelayError::Validation(format!(
                "message {} exceeds {} characters",
                index, MAX_MESSAGE_CHARS
            )));
        }

        Ok(())
    }
}
