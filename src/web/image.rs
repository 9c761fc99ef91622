// src/web/image.rs
// GET /api/protected-image - hotlink and scraper guarded image

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::fmt;
use std::io::ErrorKind;
use tracing::{debug, error, warn};

use crate::config::ImageGuardConfig;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Why a request for the image was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    MissingReferer,
    RefererNotAllowed(String),
    MissingUserAgent,
    BlockedUserAgent(String),
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDenied::MissingReferer => write!(f, "missing referer"),
            AccessDenied::RefererNotAllowed(r) => write!(f, "referer not allowed: {}", r),
            AccessDenied::MissingUserAgent => write!(f, "missing user agent"),
            AccessDenied::BlockedUserAgent(pattern) => write!(f, "user agent matched {}", pattern),
        }
    }
}

/// Referer must start with an allowed prefix; user agent must be present and
/// contain none of the blocked substrings (case-insensitive).
pub fn check_access(
    guard: &ImageGuardConfig,
    referer: Option<&str>,
    user_agent: Option<&str>,
) -> Result<(), AccessDenied> {
    let referer = referer.map(str::trim).filter(|r| !r.is_empty());
    let Some(referer) = referer else {
        return Err(AccessDenied::MissingReferer);
    };
    if !guard
        .allowed_referers
        .iter()
        .any(|prefix| referer.starts_with(prefix.as_str()))
    {
        return Err(AccessDenied::RefererNotAllowed(referer.to_string()));
    }

    let user_agent = user_agent.map(str::trim).filter(|ua| !ua.is_empty());
    let Some(user_agent) = user_agent else {
        return Err(AccessDenied::MissingUserAgent);
    };
    let lowered = user_agent.to_lowercase();
    if let Some(pattern) = guard
        .blocked_user_agents
        .iter()
        .find(|pattern| lowered.contains(pattern.as_str()))
    {
        return Err(AccessDenied::BlockedUserAgent(pattern.clone()));
    }

    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn protected_image(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let guard = state.image_guard.as_ref();

    if let Err(denied) = check_access(
        guard,
        header_str(&headers, header::REFERER),
        header_str(&headers, header::USER_AGENT),
    ) {
        warn!(reason = %denied, "Protected image request denied");
        return Err(ApiError::forbidden("Access denied"));
    }

    let Some(path) = guard.image_path.as_ref() else {
        return Err(ApiError::not_found("Image not found"));
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ApiError::not_found("Image not found")
        } else {
            error!(path = %path.display(), error = %e, "Failed to read protected image");
            ApiError::internal("Failed to load image")
        }
    })?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    debug!(path = %path.display(), bytes = bytes.len(), "Serving protected image");

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate".to_string(),
            ),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, "0".to_string()),
        ],
        bytes,
    )
        .into_response())
}
