// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm::Sampling;

pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_MAIL_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RESUME_URL: &str = "/resume.pdf";

/// User agents refused by the image endpoint when BLOCKED_USER_AGENTS is unset
const DEFAULT_BLOCKED_AGENTS: &[&str] = &[
    "curl", "wget", "python-requests", "httpclient", "scrapy", "spider", "crawler", "bot",
];

/// Completion API settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// GROQ_API_KEY
    pub api_key: Option<String>,
    /// GROQ_API_URL
    pub base_url: String,
    /// GROQ_MODEL
    pub model: String,
    /// CHAT_TEMPERATURE / CHAT_MAX_TOKENS / CHAT_TOP_P
    pub sampling: Sampling,
    /// CHAT_HISTORY_LIMIT - caller turns forwarded upstream
    pub history_limit: usize,
    /// UPSTREAM_CONNECT_TIMEOUT_SECS - until response headers arrive
    pub connect_timeout: Duration,
    /// UPSTREAM_IDLE_TIMEOUT_SECS - max gap between body chunks
    pub idle_timeout: Duration,
    /// PERSONA_KNOWLEDGE_PATH
    pub knowledge_path: Option<PathBuf>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GROQ_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            sampling: Sampling::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            knowledge_path: None,
        }
    }
}

/// Protected image endpoint settings
#[derive(Debug, Clone, Default)]
pub struct ImageGuardConfig {
    /// PROTECTED_IMAGE_PATH
    pub image_path: Option<PathBuf>,
    /// ALLOWED_REFERERS (comma separated prefixes)
    pub allowed_referers: Vec<String>,
    /// BLOCKED_USER_AGENTS (comma separated substrings, lowercased)
    pub blocked_user_agents: Vec<String>,
}

/// Contact form mail relay settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// MAIL_API_URL
    pub api_url: String,
    /// MAIL_API_KEY
    pub api_key: Option<String>,
    /// MAIL_FROM
    pub from: Option<String>,
    /// MAIL_TO
    pub to: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_MAIL_URL.to_string(),
            api_key: None,
            from: None,
            to: None,
        }
    }
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.from.is_some() && self.to.is_some()
    }
}

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// FOLIO_HOST
    pub host: String,
    /// FOLIO_PORT
    pub port: u16,
    /// RESUME_URL - target of the [DOWNLOAD_RESUME] marker
    pub resume_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            resume_url: DEFAULT_RESUME_URL.to_string(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Environment configuration - all env vars in one place
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub upstream: UpstreamConfig,
    pub image: ImageGuardConfig,
    pub mail: MailConfig,
    pub server: ServerConfig,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        info!("Loading environment configuration");
        let config = Self::from_lookup(|name| std::env::var(name).ok());
        config.log_status();
        config
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = Sampling::default();
        let upstream = UpstreamConfig {
            api_key: get("GROQ_API_KEY"),
            base_url: get("GROQ_API_URL").unwrap_or_else(|| DEFAULT_GROQ_URL.to_string()),
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            sampling: Sampling {
                temperature: parse_var(&get, "CHAT_TEMPERATURE").unwrap_or(defaults.temperature),
                max_tokens: parse_var(&get, "CHAT_MAX_TOKENS").unwrap_or(defaults.max_tokens),
                top_p: parse_var(&get, "CHAT_TOP_P").unwrap_or(defaults.top_p),
            },
            history_limit: parse_var(&get, "CHAT_HISTORY_LIMIT").unwrap_or(DEFAULT_HISTORY_LIMIT),
            connect_timeout: Duration::from_secs(
                parse_var(&get, "UPSTREAM_CONNECT_TIMEOUT_SECS").unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            idle_timeout: Duration::from_secs(
                parse_var(&get, "UPSTREAM_IDLE_TIMEOUT_SECS").unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            ),
            knowledge_path: get("PERSONA_KNOWLEDGE_PATH").map(PathBuf::from),
        };

        let image = ImageGuardConfig {
            image_path: get("PROTECTED_IMAGE_PATH").map(PathBuf::from),
            allowed_referers: get("ALLOWED_REFERERS").map(|v| split_list(&v)).unwrap_or_default(),
            blocked_user_agents: get("BLOCKED_USER_AGENTS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| DEFAULT_BLOCKED_AGENTS.iter().map(|s| s.to_string()).collect())
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        };

        let mail = MailConfig {
            api_url: get("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_URL.to_string()),
            api_key: get("MAIL_API_KEY"),
            from: get("MAIL_FROM"),
            to: get("MAIL_TO"),
        };

        let server = ServerConfig {
            host: get("FOLIO_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&get, "FOLIO_PORT").unwrap_or(DEFAULT_PORT),
            resume_url: get("RESUME_URL").unwrap_or_else(|| DEFAULT_RESUME_URL.to_string()),
        };

        Self {
            upstream,
            image,
            mail,
            server,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.upstream.api_key.is_none() {
            validation.add_warning(
                "GROQ_API_KEY is not set. The chat relay will answer every request with a configuration error.",
            );
        }

        if self.upstream.history_limit == 0 {
            validation.add_error("CHAT_HISTORY_LIMIT must be at least 1");
        }

        let temperature = self.upstream.sampling.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            validation.add_error(format!("CHAT_TEMPERATURE {} is outside 0.0..=2.0", temperature));
        }
        let top_p = self.upstream.sampling.top_p;
        if !(0.0..=1.0).contains(&top_p) {
            validation.add_error(format!("CHAT_TOP_P {} is outside 0.0..=1.0", top_p));
        }

        if self.upstream.connect_timeout.is_zero() || self.upstream.idle_timeout.is_zero() {
            validation.add_error("Upstream timeouts must be greater than zero");
        }

        if let Some(ref path) = self.upstream.knowledge_path {
            if !path.is_file() {
                validation.add_error(format!("PERSONA_KNOWLEDGE_PATH {} does not exist", path.display()));
            }
        }

        match self.image.image_path {
            None => validation.add_warning("PROTECTED_IMAGE_PATH is not set. /api/protected-image will return 404."),
            Some(ref path) if !path.is_file() => validation.add_warning(format!(
                "PROTECTED_IMAGE_PATH {} does not exist",
                path.display()
            )),
            _ => {}
        }
        if self.image.allowed_referers.is_empty() {
            validation.add_warning("ALLOWED_REFERERS is empty. /api/protected-image will refuse every request.");
        }

        if !self.mail.is_configured() {
            validation.add_warning(
                "Mail relay incomplete (MAIL_API_KEY, MAIL_FROM, MAIL_TO). The contact form will return 503.",
            );
        }

        validation
    }

    /// Log which optional features are available (without exposing secrets)
    fn log_status(&self) {
        if self.upstream.api_key.is_some() {
            debug!(model = %self.upstream.model, "Upstream API key loaded");
        } else {
            warn!("GROQ_API_KEY not set - chat relay disabled");
        }
        debug!(
            history_limit = self.upstream.history_limit,
            connect_timeout_secs = self.upstream.connect_timeout.as_secs(),
            idle_timeout_secs = self.upstream.idle_timeout.as_secs(),
            mail = self.mail.is_configured(),
            "Relay configuration"
        );
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: std::str::FromStr>(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let value = get(name)?;
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %value, "Unparseable value, using default");
            None
        }
    }
}
