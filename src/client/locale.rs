// src/client/locale.rs
// Fixed user-facing strings for the chat widget

use std::fmt;

use crate::persona::{Language, Marker};

pub const GREETING_ZH: &str =
    "你好！我是 Lin 的 AI 助手。想了解 Lin 的经历、技能或项目，尽管问我吧。";
pub const GREETING_EN: &str =
    "Hi! I'm Lin's AI assistant. Ask me anything about Lin's experience, skills or projects.";

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::Chinese => GREETING_ZH,
        Language::English => GREETING_EN,
    }
}

/// True only for the two fixed greeting strings
pub fn is_greeting(text: &str) -> bool {
    text == GREETING_ZH || text == GREETING_EN
}

/// Failure classes the widget shows in its own UI language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Relay sent an `error` event; its own text may be in another language
    Relay,
    /// Could not reach the relay or the body broke off
    Network,
    /// Relay answered with a non-2xx status
    Status(u16),
    /// Stream ended with neither text nor an error
    Interrupted,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::Relay => write!(f, "relay error"),
            ClientErrorKind::Network => write!(f, "network error"),
            ClientErrorKind::Status(code) => write!(f, "relay returned {}", code),
            ClientErrorKind::Interrupted => write!(f, "stream interrupted"),
        }
    }
}

pub fn localized_error(kind: &ClientErrorKind, language: Language) -> String {
    match (kind, language) {
        (ClientErrorKind::Relay, Language::Chinese) => {
            "抱歉，AI 助手暂时无法回答，请稍后再试或通过联系表单与我联系。".to_string()
        }
        (ClientErrorKind::Relay, Language::English) => {
            "Sorry, the assistant can't answer right now. Please try again later or use the contact form."
                .to_string()
        }
        (ClientErrorKind::Network, Language::Chinese) => {
            "抱歉，连接出现问题，请检查网络后重试。".to_string()
        }
        (ClientErrorKind::Network, Language::English) => {
            "Sorry, I couldn't connect. Please check your network and try again.".to_string()
        }
        (ClientErrorKind::Status(code), Language::Chinese) => {
            format!("抱歉，服务暂时不可用（{}），请稍后再试。", code)
        }
        (ClientErrorKind::Status(code), Language::English) => {
            format!("Sorry, the service is unavailable right now ({}). Please try again later.", code)
        }
        (ClientErrorKind::Interrupted, Language::Chinese) => {
            "抱歉，回答中断了，请再试一次。".to_string()
        }
        (ClientErrorKind::Interrupted, Language::English) => {
            "Sorry, the answer was cut off. Please try again.".to_string()
        }
    }
}

/// Label shown on the action a marker turns into
pub fn marker_label(marker: Marker, language: Language) -> &'static str {
    match (marker, language) {
        (Marker::DownloadResume, Language::Chinese) => "下载简历",
        (Marker::DownloadResume, Language::English) => "Download resume",
        (Marker::ViewPortfolio, Language::Chinese) => "查看作品集",
        (Marker::ViewPortfolio, Language::English) => "View portfolio",
        (Marker::ContactForm, Language::Chinese) => "联系我",
        (Marker::ContactForm, Language::English) => "Get in touch",
    }
}
