//! External collaborators: dialogue, narration and certificates.
//!
//! Each is a trait so sessions can run against the OpenAI-backed client in
//! production and against in-memory fakes in tests.

mod certificate;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use om_core::Turn;
use thiserror::Error;

use crate::config::AppConfig;

pub use certificate::*;
pub use openai::OpenAiClient;

/// Failures talking to an external service.
///
/// All of these are recoverable: a session reports them as notifications and
/// carries on.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from {service}: {message}")]
    UnexpectedResponse {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            message: message.into(),
        }
    }

    pub fn unexpected(service: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            service,
            message: message.into(),
        }
    }
}

/// Sampling overrides for a single dialogue request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Turns a system prompt and recent turns into reply text.
#[async_trait]
pub trait DialogueService: Send + Sync {
    /// `sampling` of `None` uses the service's configured defaults.
    async fn reply(
        &self,
        system: &str,
        turns: &[Turn],
        sampling: Option<Sampling>,
    ) -> Result<String, ServiceError>;
}

/// Turns text into speech audio.
#[async_trait]
pub trait NarrationService: Send + Sync {
    /// Returns MP3 bytes, or an empty buffer when there is nothing to say.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError>;
}

/// The collaborators a session talks to.
#[derive(Clone)]
pub struct Services {
    pub dialogue: Arc<dyn DialogueService>,
    pub narration: Arc<dyn NarrationService>,
    pub certificates: Arc<CertificateChain>,
}

impl Services {
    pub fn new(
        dialogue: Arc<dyn DialogueService>,
        narration: Arc<dyn NarrationService>,
        certificates: Arc<CertificateChain>,
    ) -> Self {
        Self {
            dialogue,
            narration,
            certificates,
        }
    }

    /// Wire the OpenAI client and the configured certificate providers.
    pub fn from_config(config: &AppConfig) -> Self {
        if config.openai.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; guided sessions will fall back to local text");
        }
        let openai = Arc::new(OpenAiClient::from_config(&config.openai));
        let dialogue: Arc<dyn DialogueService> = openai.clone();
        let certificates = Arc::new(CertificateChain::from_config(
            &config.certificate,
            dialogue.clone(),
        ));
        Self::new(dialogue, openai, certificates)
    }
}
