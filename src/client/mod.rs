// src/client/mod.rs
// Relay consumer: the chat widget's side of /api/chat

pub mod consumer;
pub mod locale;
pub mod markers;
pub mod session;

pub use consumer::{consume_stream, ConsumeOutcome, StreamFailure};
pub use locale::{localized_error, ClientErrorKind, GREETING_EN, GREETING_ZH};
pub use markers::{render, render_html, render_terminal, ActionLinks, Segment};
pub use session::{ChatSession, STORAGE_KEY};

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::Message;
use crate::persona::Language;
use crate::relay::ChatRequest;

/// Sends a session to the relay and folds the reply back into it
pub struct RelayClient {
    client: Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Append `text` as a user turn, stream the answer, and record it.
    ///
    /// A failure is recorded as an assistant turn carrying the error text in
    /// `language`. Cancellation records no reply.
    pub async fn send(
        &self,
        session: &mut ChatSession,
        text: &str,
        language: Language,
        cancel: &CancellationToken,
        on_update: impl FnMut(&str),
    ) -> ConsumeOutcome {
        session.push(Message::user(text));
        let request = ChatRequest::new(session.transcript());

        let outcome = self.exchange(&request, cancel, on_update).await;
        match &outcome {
            ConsumeOutcome::Completed(reply) => session.push(Message::assistant(reply.clone())),
            ConsumeOutcome::Failed { error, .. } => {
                warn!(error = %error, "Chat request failed");
                session.push(Message::assistant(error.display_text(language)));
            }
            ConsumeOutcome::Cancelled => debug!("Chat request cancelled"),
        }
        outcome
    }

    async fn exchange(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        on_update: impl FnMut(&str),
    ) -> ConsumeOutcome {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ConsumeOutcome::Cancelled,
            sent = self.client.post(&self.endpoint).json(request).send() => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, endpoint = %self.endpoint, "Relay unreachable");
                return ConsumeOutcome::Failed {
                    error: StreamFailure::Client(ClientErrorKind::Network),
                    partial: String::new(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ConsumeOutcome::Failed {
                error: StreamFailure::Client(ClientErrorKind::Status(status.as_u16())),
                partial: String::new(),
            };
        }

        consume_stream(Box::pin(response.bytes_stream()), cancel, on_update).await
    }
}
