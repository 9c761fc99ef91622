// src/persona/mod.rs
// Persona and system prompt assembly for the portfolio assistant

pub mod default;
pub mod language;

pub use language::{detect_from_history, detect_language, Language};

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::llm::Message;
use default::{
    DEFAULT_KNOWLEDGE, FORMAT_RULES, LANGUAGE_DIRECTIVE_EN, LANGUAGE_DIRECTIVE_ZH,
    MARKER_INSTRUCTIONS, ROLE_PROMPT,
};

/// Bracketed tokens the model may emit; the UI swaps them for actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    DownloadResume,
    ViewPortfolio,
    ContactForm,
}

impl Marker {
    pub const ALL: [Marker; 3] = [Marker::DownloadResume, Marker::ViewPortfolio, Marker::ContactForm];

    pub fn token(&self) -> &'static str {
        match self {
            Marker::DownloadResume => "[DOWNLOAD_RESUME]",
            Marker::ViewPortfolio => "[VIEW_PORTFOLIO]",
            Marker::ContactForm => "[CONTACT_FORM]",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.token() == token)
    }

    /// When the model should use this marker
    fn usage(&self) -> &'static str {
        match self {
            Marker::DownloadResume => "the visitor asks for a resume or CV",
            Marker::ViewPortfolio => "the visitor wants to see projects or work samples",
            Marker::ContactForm => "the visitor wants to hire, collaborate or get in touch",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The fixed biographical text the assistant answers from
#[derive(Debug, Clone)]
pub struct Knowledge(String);

impl Default for Knowledge {
    fn default() -> Self {
        Self(DEFAULT_KNOWLEDGE.trim().to_string())
    }
}

impl Knowledge {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    /// Read a knowledge block from disk (startup only)
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read persona knowledge from {}", path.display()))?;
        if text.trim().is_empty() {
            anyhow::bail!("persona knowledge file {} is empty", path.display());
        }
        info!(path = %path.display(), chars = text.len(), "Loaded persona knowledge");
        Ok(Self::new(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Assembles the system message prepended to every upstream request
#[derive(Debug, Clone, Default)]
pub struct PersonaBuilder {
    knowledge: Knowledge,
}

impl PersonaBuilder {
    pub fn new(knowledge: Knowledge) -> Self {
        Self { knowledge }
    }

    /// Role, knowledge, markers, formatting, then the language directive last
    pub fn system_prompt(&self, language: Language) -> String {
        let mut prompt = String::with_capacity(4096);
        prompt.push_str(ROLE_PROMPT.trim());
        prompt.push_str("\n\n");
        prompt.push_str(self.knowledge.as_str());
        prompt.push_str("\n\n");
        prompt.push_str(MARKER_INSTRUCTIONS.trim());
        for marker in Marker::ALL {
            prompt.push_str(&format!("\n- {} when {}", marker.token(), marker.usage()));
        }
        prompt.push_str("\n\n");
        prompt.push_str(FORMAT_RULES.trim());
        prompt.push_str("\n\n");
        prompt.push_str(
            match language {
                Language::Chinese => LANGUAGE_DIRECTIVE_ZH,
                Language::English => LANGUAGE_DIRECTIVE_EN,
            }
            .trim(),
        );
        prompt
    }

    pub fn build(&self, language: Language) -> Message {
        Message::system(self.system_prompt(language))
    }
}
