// src/llm/mod.rs
// Upstream LLM plumbing: wire types, streaming client, SSE decoding

pub mod client;
pub mod sse;
pub mod types;

pub use client::{ByteStream, CompletionBackend, GroqClient};
pub use sse::{parse_upstream_line, SseFrameDecoder, SseLineDecoder, UpstreamLine};
pub use types::{CompletionRequest, Message, Role, Sampling};
