// src/client/markers.rs
// Turn [DOWNLOAD_RESUME]-style tokens in replies into actions

use super::locale::marker_label;
use crate::persona::{Language, Marker};

/// Piece of a rendered reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Action(Marker),
}

/// Where each action leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLinks {
    pub resume_url: String,
    pub portfolio_anchor: String,
    pub contact_anchor: String,
}

impl Default for ActionLinks {
    fn default() -> Self {
        Self::new("/resume.pdf")
    }
}

impl ActionLinks {
    pub fn new(resume_url: impl Into<String>) -> Self {
        Self {
            resume_url: resume_url.into(),
            portfolio_anchor: "#portfolio".to_string(),
            contact_anchor: "#contact".to_string(),
        }
    }

    pub fn target(&self, marker: Marker) -> &str {
        match marker {
            Marker::DownloadResume => &self.resume_url,
            Marker::ViewPortfolio => &self.portfolio_anchor,
            Marker::ContactForm => &self.contact_anchor,
        }
    }
}

/// Split text at every known marker token. Unknown bracketed text and
/// partially streamed tokens stay plain text.
pub fn render(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some((index, marker)) = next_marker(rest) {
        if index > 0 {
            segments.push(Segment::Text(&rest[..index]));
        }
        segments.push(Segment::Action(marker));
        rest = &rest[index + marker.token().len()..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
    Marker::ALL
        .into_iter()
        .filter_map(|marker| text.find(marker.token()).map(|index| (index, marker)))
        .min_by_key(|(index, _)| *index)
}

/// Plain-text rendering for terminals: markers become `[label → target]`
pub fn render_terminal(text: &str, links: &ActionLinks, language: Language) -> String {
    render(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(t) => t.to_string(),
            Segment::Action(marker) => {
                format!("[{} → {}]", marker_label(marker, language), links.target(marker))
            }
        })
        .collect()
}

/// HTML rendering for the widget: escaped text plus anchors
pub fn render_html(text: &str, links: &ActionLinks, language: Language) -> String {
    let mut html = String::with_capacity(text.len());
    for segment in render(text) {
        match segment {
            Segment::Text(t) => html.push_str(&escape_html(t)),
            Segment::Action(marker) => {
                let label = marker_label(marker, language);
                let href = escape_html(links.target(marker));
                let anchor = match marker {
                    Marker::DownloadResume => {
                        format!(r#"<a class="chat-action" href="{}" download>{}</a>"#, href, label)
                    }
                    Marker::ViewPortfolio => format!(
                        r#"<a class="chat-action" href="{}" data-action="scroll-portfolio">{}</a>"#,
                        href, label
                    ),
                    Marker::ContactForm => format!(
                        r#"<a class="chat-action" href="{}" data-action="open-contact">{}</a>"#,
                        href, label
                    ),
                };
                html.push_str(&anchor);
            }
        }
    }
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
