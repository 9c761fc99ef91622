// src/llm/client.rs
// Upstream completion client (Groq, OpenAI-compatible chat completions)

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use super::types::CompletionRequest;
use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};

/// Raw body chunks of a streaming completion
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Anything that can open a streaming chat completion
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send the request and return the response body as a chunk stream.
    /// Non-2xx answers surface as `RelayError::Upstream`.
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ByteStream>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Groq chat completions client
pub struct GroqClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GroqClient {
    /// Fails when no API key is configured, so a misconfigured server is
    /// detected at startup rather than on the first visitor question.
    pub fn new(client: Client, config: &UpstreamConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RelayError::Configuration("GROQ_API_KEY is not set".to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: completions_url(&config.base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for GroqClient {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ByteStream> {
        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "Opening upstream completion stream"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Upstream completion request failed");
            return Err(RelayError::upstream(status.as_u16(), body));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RelayError::from))
            .boxed())
    }

    fn name(&self) -> &str {
        "groq"
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash or a full URL
fn completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}
