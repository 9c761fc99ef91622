// src/relay/mod.rs
// Chat relay: validate, prepend persona, stream upstream deltas downstream

pub mod event;
pub mod request;

pub use event::StreamEvent;
pub use request::{ChatRequest, MAX_MESSAGE_CHARS};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};
use crate::llm::{
    parse_upstream_line, CompletionBackend, CompletionRequest, GroqClient, Message, Sampling,
    SseLineDecoder, UpstreamLine,
};
use crate::persona::{detect_from_history, Language, PersonaBuilder};

/// Lifecycle of one relay request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::Streaming => "streaming",
            RelayState::Completed => "completed",
            RelayState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-relay tuning, fixed at startup
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub model: String,
    pub sampling: Sampling,
    /// Most recent caller messages forwarded upstream
    pub history_limit: usize,
    /// Time allowed until the upstream answers with headers
    pub connect_timeout: Duration,
    /// Longest silence tolerated between upstream body chunks
    pub idle_timeout: Duration,
}

impl From<&UpstreamConfig> for RelayOptions {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            model: config.model.clone(),
            sampling: config.sampling,
            history_limit: config.history_limit.max(1),
            connect_timeout: config.connect_timeout,
            idle_timeout: config.idle_timeout,
        }
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

/// What happened during one request (for logs and tests)
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub request_id: String,
    pub state: RelayState,
    pub language: Language,
    pub content_events: usize,
    pub chars: usize,
    pub skipped_lines: usize,
    pub upstream_calls: usize,
    /// Downstream went away before the end
    pub cancelled: bool,
    pub error: Option<String>,
    /// HTTP status matching `error`, for callers answering with plain JSON
    pub error_status: Option<u16>,
}

impl RelayOutcome {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            state: RelayState::Idle,
            language: Language::LOCAL,
            content_events: 0,
            chars: 0,
            skipped_lines: 0,
            upstream_calls: 0,
            cancelled: false,
            error: None,
            error_status: None,
        }
    }

    fn transition(&mut self, to: RelayState) {
        debug!(request_id = %self.request_id, from = %self.state, to = %to, "Relay state change");
        self.state = to;
    }
}

/// Whether the upstream signalled end-of-stream
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// The chat relay. One instance serves all requests; it holds no per-request state.
pub struct ChatRelay {
    backend: std::result::Result<Arc<dyn CompletionBackend>, String>,
    persona: PersonaBuilder,
    options: RelayOptions,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn CompletionBackend>, persona: PersonaBuilder, options: RelayOptions) -> Self {
        Self {
            backend: Ok(backend),
            persona,
            options,
        }
    }

    /// A relay that refuses every request with a configuration error
    pub fn unconfigured(reason: impl Into<String>, persona: PersonaBuilder, options: RelayOptions) -> Self {
        Self {
            backend: Err(reason.into()),
            persona,
            options,
        }
    }

    /// Build the Groq-backed relay; a missing API key yields an unconfigured relay
    pub fn from_config(client: Client, config: &UpstreamConfig, persona: PersonaBuilder) -> Self {
        let options = RelayOptions::from(config);
        match GroqClient::new(client, config) {
            Ok(groq) => {
                info!(model = %options.model, history_limit = options.history_limit, "Chat relay ready");
                Self::new(Arc::new(groq), persona, options)
            }
            Err(e) => {
                warn!(error = %e, "Chat relay disabled");
                Self::unconfigured(e.to_string(), persona, options)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_ok()
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// `[system persona] + last history_limit caller messages` (at least one)
    pub fn upstream_messages(&self, history: &[Message], language: Language) -> Vec<Message> {
        let start = history.len().saturating_sub(self.options.history_limit.max(1));
        let mut messages = Vec::with_capacity(history.len() - start + 1);
        messages.push(self.persona.build(language));
        messages.extend_from_slice(&history[start..]);
        messages
    }

    /// Run one request to completion, writing events to `tx`.
    ///
    /// Every path that still has a listener ends with exactly one `Done`
    /// event; failures send a single `Error` event first. Dropping the
    /// receiver cancels the upstream read promptly.
    pub async fn run(
        &self,
        request: Result<ChatRequest>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> RelayOutcome {
        let start = Instant::now();
        let mut outcome = RelayOutcome::new();

        let result = match request {
            Ok(req) => {
                outcome.language = detect_from_history(&req.messages);
                match req.validate() {
                    Ok(()) => self.stream(req, &tx, &mut outcome).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                outcome.transition(RelayState::Completed);
                let _ = tx.send(StreamEvent::done()).await;
            }
            Err(RelayError::Cancelled) => {
                outcome.cancelled = true;
                outcome.error = Some(RelayError::Cancelled.to_string());
                outcome.error_status = Some(RelayError::Cancelled.status_code());
                outcome.transition(RelayState::Failed);
            }
            Err(e) => {
                outcome.error = Some(e.to_string());
                outcome.error_status = Some(e.status_code());
                outcome.transition(RelayState::Failed);
                let _ = tx.send(StreamEvent::error(e.user_message(outcome.language))).await;
                let _ = tx.send(StreamEvent::done()).await;
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome.error {
            None => info!(
                request_id = %outcome.request_id,
                language = %outcome.language,
                content_events = outcome.content_events,
                chars = outcome.chars,
                skipped_lines = outcome.skipped_lines,
                duration_ms = duration_ms,
                "Chat relay complete"
            ),
            Some(ref error) if outcome.cancelled => info!(
                request_id = %outcome.request_id,
                content_events = outcome.content_events,
                duration_ms = duration_ms,
                error = %error,
                "Chat relay cancelled by client"
            ),
            Some(ref error) => warn!(
                request_id = %outcome.request_id,
                upstream_calls = outcome.upstream_calls,
                content_events = outcome.content_events,
                duration_ms = duration_ms,
                error = %error,
                "Chat relay failed"
            ),
        }

        outcome
    }

    async fn stream(
        &self,
        req: ChatRequest,
        tx: &mpsc::Sender<StreamEvent>,
        outcome: &mut RelayOutcome,
    ) -> Result<()> {
        let backend = self
            .backend
            .as_ref()
            .map_err(|reason| RelayError::Configuration(reason.clone()))?;

        let messages = self.upstream_messages(&req.messages, outcome.language);
        let request = CompletionRequest::streaming(&self.options.model, messages, self.options.sampling);

        outcome.transition(RelayState::Streaming);
        outcome.upstream_calls += 1;
        debug!(
            request_id = %outcome.request_id,
            backend = backend.name(),
            upstream_messages = request.messages.len(),
            "Calling upstream"
        );

        let connect_secs = self.options.connect_timeout.as_secs();
        let mut body = tokio::select! {
            biased;
            _ = tx.closed() => return Err(RelayError::Cancelled),
            opened = timeout(self.options.connect_timeout, backend.open_stream(&request)) => {
                opened.map_err(|_| RelayError::Timeout(connect_secs))??
            }
        };

        let idle_secs = self.options.idle_timeout.as_secs();
        let mut decoder = SseLineDecoder::new();
        let mut finished = false;

        'read: loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => return Err(RelayError::Cancelled),
                next = timeout(self.options.idle_timeout, body.next()) => {
                    next.map_err(|_| RelayError::Timeout(idle_secs))?
                }
            };

            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };

            for line in decoder.push(&chunk)? {
                if self.handle_line(&line, tx, outcome).await? == Flow::Finished {
                    finished = true;
                    break 'read;
                }
            }
        }

        if !finished {
            if let Some(line) = decoder.finish() {
                self.handle_line(&line, tx, outcome).await?;
            }
        }

        if outcome.content_events == 0 {
            return Err(RelayError::EmptyResponse);
        }
        Ok(())
    }

    async fn handle_line(
        &self,
        line: &str,
        tx: &mpsc::Sender<StreamEvent>,
        outcome: &mut RelayOutcome,
    ) -> Result<Flow> {
        match parse_upstream_line(line) {
            UpstreamLine::Delta(content) => {
                outcome.content_events += 1;
                outcome.chars += content.chars().count();
                tx.send(StreamEvent::content(content))
                    .await
                    .map_err(|_| RelayError::Cancelled)?;
                Ok(Flow::Continue)
            }
            UpstreamLine::Done => Ok(Flow::Finished),
            UpstreamLine::Empty => Ok(Flow::Continue),
            UpstreamLine::Malformed(reason) => {
                outcome.skipped_lines += 1;
                debug!(
                    request_id = %outcome.request_id,
                    error = %RelayError::StreamDecode(reason),
                    "Skipped upstream line"
                );
                Ok(Flow::Continue)
            }
            UpstreamLine::Error { status, message } => {
                Err(RelayError::upstream(status.unwrap_or(502), message))
            }
        }
    }
}
