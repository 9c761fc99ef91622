// src/persona/language.rs
// Response language detection from the visitor's latest message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::llm::{Message, Role};

/// Minimum number of Latin words (with no CJK at all) before we answer in English
const MIN_LATIN_RUNS: usize = 2;

/// Languages the assistant answers in. Chinese is the site's local language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub const LOCAL: Language = Language::Chinese;

    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Ok(Language::Chinese),
            "en" | "en-us" | "english" => Ok(Language::English),
            other => Err(format!("unknown language '{}', expected zh or en", other)),
        }
    }
}

/// Script counts for a piece of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptStats {
    pub cjk_chars: usize,
    pub latin_runs: usize,
}

impl ScriptStats {
    pub fn of(text: &str) -> Self {
        let mut stats = ScriptStats::default();
        let mut in_latin = false;
        for c in text.chars() {
            if is_cjk(c) {
                stats.cjk_chars += 1;
                in_latin = false;
            } else if is_latin(c) {
                if !in_latin {
                    stats.latin_runs += 1;
                }
                in_latin = true;
            } else {
                in_latin = false;
            }
        }
        stats
    }
}

/// Pick the response language for a message.
///
/// Any CJK character selects Chinese. With no CJK, two or more Latin words
/// select English. Everything else (a lone "hi", digits, emoji) falls back to
/// the local language.
pub fn detect_language(text: &str) -> Language {
    let stats = ScriptStats::of(text);
    if stats.cjk_chars > 0 {
        Language::Chinese
    } else if stats.latin_runs >= MIN_LATIN_RUNS {
        Language::English
    } else {
        Language::LOCAL
    }
}

/// Detect from the most recent user message in a transcript
pub fn detect_from_history(messages: &[Message]) -> Language {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| detect_language(&m.content))
        .unwrap_or(Language::LOCAL)
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F      // CJK symbols and punctuation
        | 0x3040..=0x30FF    // Hiragana, Katakana
        | 0x3400..=0x4DBF    // Ext A
        | 0x4E00..=0x9FFF    // Unified ideographs
        | 0xAC00..=0xD7AF    // Hangul syllables
        | 0xF900..=0xFAFF    // Compatibility ideographs
        | 0xFF00..=0xFFEF    // Full-width forms
        | 0x20000..=0x2A6DF) // Ext B
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic()
        || (matches!(c as u32, 0x00C0..=0x024F) && c != '\u{00D7}' && c != '\u{00F7}')
}
