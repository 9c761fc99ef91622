// src/web/state.rs
// Shared state handed to every handler

use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tracing::warn;

use crate::config::{EnvConfig, ImageGuardConfig};
use crate::mail::Mailer;
use crate::persona::{Knowledge, PersonaBuilder};
use crate::relay::ChatRelay;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub image_guard: Arc<ImageGuardConfig>,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub fn new(relay: ChatRelay, image_guard: ImageGuardConfig, mailer: Mailer) -> Self {
        Self {
            relay: Arc::new(relay),
            image_guard: Arc::new(image_guard),
            mailer: Arc::new(mailer),
        }
    }

    /// Wire up the relay, image guard and mailer from environment config
    pub fn from_config(config: &EnvConfig, client: Client) -> Result<Self> {
        let knowledge = match &config.upstream.knowledge_path {
            Some(path) => Knowledge::from_file(path)?,
            None => Knowledge::default(),
        };

        let persona = PersonaBuilder::new(knowledge);
        let relay = ChatRelay::from_config(client.clone(), &config.upstream, persona);

        let mailer = Mailer::new(client, config.mail.clone());
        if !mailer.is_configured() {
            warn!("Mail provider not configured, contact form will answer 503");
        }

        Ok(Self::new(relay, config.image.clone(), mailer))
    }
}
