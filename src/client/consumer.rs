// src/client/consumer.rs
// Incremental reader for the relay's event stream

use std::fmt;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::locale::{localized_error, ClientErrorKind};
use crate::llm::sse::{SseFrameDecoder, DONE_SENTINEL};
use crate::persona::Language;

/// Why a consumed stream did not produce an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The relay sent an `error` event; the detail is kept for logs
    Relay(String),
    /// Transport or protocol trouble on our side
    Client(ClientErrorKind),
}

impl StreamFailure {
    /// Text to show in place of the assistant reply, always in `language`
    pub fn display_text(&self, language: Language) -> String {
        match self {
            StreamFailure::Relay(_) => localized_error(&ClientErrorKind::Relay, language),
            StreamFailure::Client(kind) => localized_error(kind, language),
        }
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFailure::Relay(message) => write!(f, "relay error: {}", message),
            StreamFailure::Client(kind) => write!(f, "{}", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Completed(String),
    Failed { error: StreamFailure, partial: String },
    /// Stopped by the caller; nothing should be shown
    Cancelled,
}

#[derive(Default)]
struct Accumulator {
    text: String,
    error: Option<String>,
    finished: bool,
}

impl Accumulator {
    fn apply(&mut self, payload: &str, on_update: &mut impl FnMut(&str)) {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            self.finished = true;
            return;
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable frame");
                return;
            }
        };

        if let Some(content) = value.get("content").and_then(Value::as_str) {
            if !content.is_empty() {
                self.text.push_str(content);
                on_update(&self.text);
            }
        }
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            self.error = Some(error.to_string());
        }
        if value.get("done").and_then(Value::as_bool) == Some(true) {
            self.finished = true;
        }
    }

    fn into_outcome(self) -> ConsumeOutcome {
        match self.error {
            Some(message) => ConsumeOutcome::Failed {
                error: StreamFailure::Relay(message),
                partial: self.text,
            },
            None if self.finished || !self.text.is_empty() => {
                if !self.finished {
                    debug!(chars = self.text.len(), "Stream ended without done event");
                }
                ConsumeOutcome::Completed(self.text)
            }
            None => ConsumeOutcome::Failed {
                error: StreamFailure::Client(ClientErrorKind::Interrupted),
                partial: self.text,
            },
        }
    }
}

/// Read a relay response body to its end.
///
/// `on_update` receives the whole accumulated text after every content
/// event. A triggered `cancel` stops reading at once and yields `Cancelled`.
pub async fn consume_stream<S, E>(
    mut body: S,
    cancel: &CancellationToken,
    mut on_update: impl FnMut(&str),
) -> ConsumeOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let mut decoder = SseFrameDecoder::new();
    let mut acc = Accumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ConsumeOutcome::Cancelled,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let payloads = match decoder.push(&chunk) {
                    Ok(payloads) => payloads,
                    Err(e) => {
                        debug!(error = %e, "Relay body undecodable");
                        return ConsumeOutcome::Failed {
                            error: StreamFailure::Client(ClientErrorKind::Interrupted),
                            partial: acc.text,
                        };
                    }
                };
                for payload in payloads {
                    acc.apply(&payload, &mut on_update);
                    if acc.finished {
                        return acc.into_outcome();
                    }
                }
            }
            Some(Err(e)) => {
                debug!(error = %e, "Relay body failed");
                return ConsumeOutcome::Failed {
                    error: StreamFailure::Client(ClientErrorKind::Network),
                    partial: acc.text,
                };
            }
            None => break,
        }
    }

    if let Some(payload) = decoder.finish() {
        acc.apply(&payload, &mut on_update);
    }
    acc.into_outcome()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, String>> + Unpin {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
    }

    #[tokio::test]
    async fn test_accumulates_content_until_done() {
        let mut updates = Vec::new();
        let outcome = consume_stream(
            body(vec![
                "data: {\"content\":\"Hel\"}\n\n",
                "data: {\"content\":\"lo\"}\n\ndata: {\"done\":true}\n\n",
                "data: {\"content\":\"ignored\"}\n\n",
            ]),
            &CancellationToken::new(),
            |text| updates.push(text.to_string()),
        )
        .await;

        assert_eq!(outcome, ConsumeOutcome::Completed("Hello".into()));
        assert_eq!(updates, vec!["Hel".to_string(), "Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_error_event_shown_in_ui_language() {
        let outcome = consume_stream(
            body(vec!["data: {\"error\":\"AI 助手暂未配置\"}\n\ndata: {\"done\":true}\n\n"]),
            &CancellationToken::new(),
            |_| {},
        )
        .await;

        match outcome {
            ConsumeOutcome::Failed { error, partial } => {
                assert_eq!(error, StreamFailure::Relay("AI 助手暂未配置".into()));
                assert_eq!(
                    error.display_text(Language::English),
                    localized_error(&ClientErrorKind::Relay, Language::English)
                );
                assert!(error.display_text(Language::English).is_ascii());
                assert!(error.to_string().contains("AI 助手暂未配置"));
                assert!(partial.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_done_sentinel_and_keepalive_comments() {
        let outcome = consume_stream(
            body(vec![": keep-alive\n\n", "data: {\"content\":\"ok\"}\n\n", "data: [DONE]\n\n"]),
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        assert_eq!(outcome, ConsumeOutcome::Completed("ok".into()));
    }

    #[tokio::test]
    async fn test_utf8_split_between_chunks() {
        let frame = "data: {\"content\":\"你好\"}\n\ndata: {\"done\":true}\n\n".as_bytes();
        let cut = 22; // inside the second ideograph
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::copy_from_slice(&frame[..cut])),
            Ok(Bytes::copy_from_slice(&frame[cut..])),
        ];
        let outcome =
            consume_stream(futures::stream::iter(chunks), &CancellationToken::new(), |_| {}).await;
        assert_eq!(outcome, ConsumeOutcome::Completed("你好".into()));
    }

    #[tokio::test]
    async fn test_unparseable_frames_skipped() {
        let outcome = consume_stream(
            body(vec!["data: {oops\n\n", "data: {\"content\":\"fine\"}\n\n", "data: {\"done\":true}\n\n"]),
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        assert_eq!(outcome, ConsumeOutcome::Completed("fine".into()));
    }

    #[tokio::test]
    async fn test_empty_stream_is_interrupted() {
        let outcome = consume_stream(body(vec![]), &CancellationToken::new(), |_| {}).await;
        assert_eq!(
            outcome,
            ConsumeOutcome::Failed {
                error: StreamFailure::Client(ClientErrorKind::Interrupted),
                partial: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"par\"}\n\n")),
            Err("connection reset".to_string()),
        ];
        let outcome =
            consume_stream(futures::stream::iter(chunks), &CancellationToken::new(), |_| {}).await;
        assert_eq!(
            outcome,
            ConsumeOutcome::Failed {
                error: StreamFailure::Client(ClientErrorKind::Network),
                partial: "par".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_silently() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pending = futures::stream::pending::<Result<Bytes, String>>();
        let mut updates = 0;
        let outcome = consume_stream(pending, &cancel, |_| updates += 1).await;
        assert_eq!(outcome, ConsumeOutcome::Cancelled);
        assert_eq!(updates, 0);
    }

    #[tokio::test]
    async fn test_cancel_after_content_stops_without_more_updates() {
        let frames = futures::stream::iter(vec![
            Ok::<_, String>(Bytes::from_static(b"data: {\"content\":\"Hel\"}\n\n")),
            Ok(Bytes::from_static(b"data: {\"content\":\"lo\"}\n\n")),
        ]);
        let body = frames.chain(futures::stream::pending());

        let cancel = CancellationToken::new();
        let mut updates = Vec::new();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            consume_stream(Box::pin(body), &cancel, |text| {
                updates.push(text.to_string());
                if updates.len() == 2 {
                    cancel.cancel();
                }
            }),
        )
        .await
        .expect("cancel did not stop the read");

        assert_eq!(outcome, ConsumeOutcome::Cancelled);
        assert_eq!(updates, vec!["Hel".to_string(), "Hello".to_string()]);
    }
}
