// src/client/session.rs
// Persisted chat transcript for the widget/CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::locale::{greeting, is_greeting};
use crate::llm::{Message, Role};
use crate::persona::Language;

/// Storage key the transcript lives under
pub const STORAGE_KEY: &str = "portfolio-chat-history";

/// Ordered transcript; index 0 is the greeting placeholder
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    path: Option<PathBuf>,
}

impl ChatSession {
    /// Fresh in-memory session holding only the greeting
    pub fn new(language: Language) -> Self {
        Self {
            messages: vec![Message::assistant(greeting(language))],
            path: None,
        }
    }

    /// `<data dir>/folio`, where sessions live unless told otherwise
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("folio"))
    }

    pub fn storage_path(dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", STORAGE_KEY))
    }

    /// Restore from `dir`; a missing or unreadable file starts a fresh session
    pub fn load(dir: &Path, language: Language) -> Self {
        let path = Self::storage_path(dir);
        let mut session = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(messages) if !messages.is_empty() => {
                    debug!(path = %path.display(), messages = messages.len(), "Restored chat session");
                    Self { messages, path: None }
                }
                Ok(_) => Self::new(language),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding corrupt chat session");
                    Self::new(language)
                }
            },
            Err(_) => Self::new(language),
        };
        session.path = Some(path);
        session.set_language(language);
        session
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.messages)?;
        std::fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Swap the greeting placeholder to `language`.
    ///
    /// Only an untouched fixed greeting is replaced; any other first message
    /// is left alone. Returns whether a swap happened.
    pub fn set_language(&mut self, language: Language) -> bool {
        let target = greeting(language);
        match self.messages.first_mut() {
            Some(first)
                if first.role == Role::Assistant && is_greeting(&first.content) && first.content != target =>
            {
                first.content = target.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages sent to the relay; the greeting placeholder stays local
    pub fn transcript(&self) -> Vec<Message> {
        let skip = match self.messages.first() {
            Some(first) if first.role == Role::Assistant && is_greeting(&first.content) => 1,
            _ => 0,
        };
        self.messages[skip..].to_vec()
    }

    /// Drop everything but a fresh greeting
    pub fn reset(&mut self, language: Language) {
        self.messages = vec![Message::assistant(greeting(language))];
    }
}
