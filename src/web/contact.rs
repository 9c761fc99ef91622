// src/web/contact.rs
// POST /api/send-message - contact form

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::mail::ContactMessage;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;

const MAX_NAME_CHARS: usize = 200;
const MAX_EMAIL_CHARS: usize = 320;
const MAX_SUBJECT_CHARS: usize = 300;
const MAX_BODY_CHARS: usize = 5000;

/// Raw form body; every field defaults so missing ones surface as validation errors
#[derive(Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Trimmed, length-checked message or a user-facing reason
    pub fn validate(self) -> Result<ContactMessage, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();
        let subject = self
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err("Name, email and message are required".to_string());
        }
        if !is_plausible_email(email) {
            return Err("Please provide a valid email address".to_string());
        }
        if name.chars().count() > MAX_NAME_CHARS
            || email.chars().count() > MAX_EMAIL_CHARS
            || subject.is_some_and(|s| s.chars().count() > MAX_SUBJECT_CHARS)
            || message.chars().count() > MAX_BODY_CHARS
        {
            return Err("Message is too long".to_string());
        }

        Ok(ContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            subject: subject.map(str::to_string),
            message: message.to_string(),
        })
    }
}

/// Something before and after a single `@`
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(form) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let contact = form.validate().map_err(ApiError::bad_request)?;

    if !state.mailer.is_configured() {
        return Err(ApiError::unavailable("Contact form is not available right now"));
    }

    state.mailer.send(&contact).await.map_err(|e| {
        error!(error = %e, "Failed to deliver contact message");
        ApiError::internal("Failed to send message")
    })?;

    Ok(Json(json!({ "message": "Message sent successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.into(),
            email: email.into(),
            subject: None,
            message: message.into(),
        }
    }

    #[test]
    fn test_valid_form_is_trimmed() {
        let contact = form("  Ada ", "ada@example.com", " Hi there ").validate().unwrap();
        assert_eq!(contact.name, "Ada");
        assert_eq!(contact.message, "Hi there");
        assert_eq!(contact.subject, None);
    }

    #[test]
    fn test_required_fields() {
        assert!(form("", "ada@example.com", "hi").validate().unwrap_err().contains("required"));
        assert!(form("Ada", "ada@example.com", "   ").validate().is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(form("Ada", "not-an-email", "hi").validate().unwrap_err().contains("email"));
        assert!(form("Ada", "@example.com", "hi").validate().is_err());
        assert!(form("Ada", "a@b@c", "hi").validate().is_err());
        assert!(is_plausible_email("ada@example.com"));
    }

    #[test]
    fn test_message_length() {
        let long = "x".repeat(MAX_BODY_CHARS + 1);
        assert!(form("Ada", "ada@example.com", &long).validate().unwrap_err().contains("too long"));
    }
}
