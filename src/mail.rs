// src/mail.rs
// Contact form delivery through a JSON mail API (Resend-compatible)

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::MailConfig;

/// A validated contact form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: String,
    text: String,
}

/// Sends contact messages to the site owner
pub struct Mailer {
    client: Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(client: Client, config: MailConfig) -> Self {
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub async fn send(&self, contact: &ContactMessage) -> Result<()> {
        let (Some(api_key), Some(from), Some(to)) =
            (&self.config.api_key, &self.config.from, &self.config.to)
        else {
            return Err(anyhow!("mail provider is not configured"));
        };

        let mail = OutgoingMail {
            from: from.as_str(),
            to: [to.as_str()],
            reply_to: contact.email.as_str(),
            subject: subject_line(contact),
            text: format!(
                "Name: {}\nEmail: {}\n\n{}",
                contact.name, contact.email, contact.message
            ),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&mail)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail provider rejected message");
            return Err(anyhow!("mail provider error {}: {}", status, body));
        }

        info!(from = %contact.email, "Contact message delivered");
        Ok(())
    }
}

fn subject_line(contact: &ContactMessage) -> String {
    match contact.subject.as_deref().map(str::trim) {
        Some(subject) if !subject.is_empty() => format!("[Portfolio] {}", subject),
        _ => format!("[Portfolio] Message from {}", contact.name),
    }
}
