// src/error.rs
// Error taxonomy for the chat relay and its collaborators

use thiserror::Error;

use crate::persona::Language;

/// Longest upstream error body carried in an error (bytes, char-boundary safe)
const MAX_ERROR_BODY: usize = 512;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or unusable credentials/config. Fatal per request, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or malformed transcript. Rejected before any upstream call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Non-2xx answer from the completion API
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Connection/transport failure talking to the completion API
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream timed out after {0}s")]
    Timeout(u64),

    /// Undecodable SSE data. A bad line is skipped; an oversized one ends the stream.
    #[error("stream decode error: {0}")]
    StreamDecode(String),

    /// Stream finished without a single content token
    #[error("upstream returned an empty response")]
    EmptyResponse,

    /// Downstream went away mid-stream
    #[error("request cancelled")]
    Cancelled,
}

/// Convenience type alias for Result using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Build an upstream error, trimming oversized bodies
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        RelayError::Upstream {
            status,
            body: truncate_body(body.into()),
        }
    }

    /// Human-readable text sent to the visitor in the stream's `error` event
    pub fn user_message(&self, language: Language) -> String {
        let zh = language == Language::Chinese;
        match self {
            RelayError::Configuration(_) => if zh {
                "AI 助手暂未配置，请稍后再试或直接通过联系表单与我联系。"
            } else {
                "The AI assistant is not configured right now. Please try again later or use the contact form."
            }
            .to_string(),
            RelayError::Validation(detail) => if zh {
                format!("请求无效：{}", detail)
            } else {
                format!("Invalid request: {}", detail)
            },
            RelayError::Upstream { status, .. } => if zh {
                format!("AI 服务暂时不可用（状态码 {}），请稍后再试。", status)
            } else {
                format!("The AI service is temporarily unavailable (status {}). Please try again later.", status)
            },
            RelayError::Transport(_) | RelayError::StreamDecode(_) => if zh {
                "连接 AI 服务时出错，请稍后再试。"
            } else {
                "Something went wrong while contacting the AI service. Please try again later."
            }
            .to_string(),
            RelayError::Timeout(_) => if zh {
                "AI 服务响应超时，请稍后再试。"
            } else {
                "The AI service took too long to respond. Please try again later."
            }
            .to_string(),
            RelayError::EmptyResponse => if zh {
                "AI 没有返回任何内容，请换个问法再试一次。"
            } else {
                "The AI returned an empty response. Please try rephrasing your question."
            }
            .to_string(),
            RelayError::Cancelled => if zh { "请求已取消。" } else { "Request cancelled." }.to_string(),
        }
    }

    /// HTTP status used when the error is reported outside of a stream
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Configuration(_) => 503,
            RelayError::Validation(_) => 400,
            RelayError::Upstream { .. } | RelayError::Transport(_) | RelayError::EmptyResponse => 502,
            RelayError::Timeout(_) => 504,
            RelayError::StreamDecode(_) => 502,
            RelayError::Cancelled => 499,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Transport(format!("timeout: {}", err))
        } else {
            RelayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::StreamDecode(err.to_string())
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
