//! Certificate providers and the fallback chain that selects between them.

mod agent;
mod local;
pub mod pdf;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use om_core::{guidance, SessionConfig, Transcript, Turn};
use serde::Serialize;

use super::{DialogueService, Sampling, ServiceError};
use crate::config::{CertificateConfig, ProviderKind};

pub use agent::RemoteReportAgent;
pub use local::LocalCertificate;

/// Everything a provider needs to produce a certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRequest {
    pub persona_label: String,
    pub persona_style: String,
    pub intent: String,
    pub mantra: String,
    pub minutes: u32,
    /// Most recent turns of the session, oldest first.
    pub transcript: Vec<Turn>,
    pub issued_on: NaiveDate,
}

impl CertificateRequest {
    pub fn new(
        config: &SessionConfig,
        transcript: &Transcript,
        window: usize,
        issued_on: NaiveDate,
    ) -> Self {
        Self {
            persona_label: guidance::signature(&config.persona).to_string(),
            persona_style: config.persona.style.clone(),
            intent: config.intent.as_str().to_string(),
            mantra: config.mantra.clone(),
            minutes: config.minutes,
            transcript: transcript.recent(window).to_vec(),
            issued_on,
        }
    }

    /// `Label  •  October 19, 2026  •  10 min  •  Intent: focus  •  Mantra: "..."`
    pub fn subtitle(&self) -> String {
        format!(
            "{}  \u{2022}  {}  \u{2022}  {} min  \u{2022}  Intent: {}  \u{2022}  Mantra: \"{}\"",
            self.persona_label,
            self.issued_on.format("%B %d, %Y"),
            self.minutes,
            self.intent,
            self.mantra
        )
    }
}

/// A way of producing a certificate PDF.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, request: &CertificateRequest) -> Result<Vec<u8>, ServiceError>;
}

/// A certificate and how it was obtained.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    pub pdf: Vec<u8>,
    pub provider: String,
    /// One message per provider that failed before this one succeeded.
    pub warnings: Vec<String>,
}

/// Providers tried in priority order until one returns a PDF.
pub struct CertificateChain {
    providers: Vec<Arc<dyn CertificateProvider>>,
}

impl CertificateChain {
    pub fn new(providers: Vec<Arc<dyn CertificateProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain in configured order. The agent is skipped when no URL
    /// is configured.
    pub fn from_config(config: &CertificateConfig, dialogue: Arc<dyn DialogueService>) -> Self {
        let mut providers: Vec<Arc<dyn CertificateProvider>> = Vec::new();
        for kind in &config.providers {
            match kind {
                ProviderKind::Agent => {
                    if let Some(url) = &config.agent_url {
                        providers.push(Arc::new(RemoteReportAgent::new(
                            url.clone(),
                            std::time::Duration::from_secs(config.agent_timeout_secs),
                        )));
                    }
                }
                ProviderKind::Local => providers.push(Arc::new(LocalCertificate::new(
                    dialogue.clone(),
                    Sampling {
                        temperature: config.note_temperature,
                        max_tokens: config.note_max_tokens,
                    },
                ))),
            }
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn render(
        &self,
        request: &CertificateRequest,
    ) -> Result<RenderedCertificate, ServiceError> {
        let mut warnings = Vec::new();

        for provider in &self.providers {
            let result = provider.render(request).await.and_then(|pdf| {
                if pdf::looks_like_pdf(&pdf) {
                    Ok(pdf)
                } else {
                    Err(ServiceError::unexpected("certificate provider", "response is not a PDF document"))
                }
            });

            match result {
                Ok(pdf) => {
                    tracing::info!(provider = provider.name(), bytes = pdf.len(), "Certificate rendered");
                    return Ok(RenderedCertificate {
                        pdf,
                        provider: provider.name().to_string(),
                        warnings,
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "Certificate provider failed: {}", e);
                    warnings.push(format!("{} unavailable, trying the next option. ({})", provider.name(), e));
                }
            }
        }

        Err(ServiceError::unavailable(
            "certificate service",
            match warnings.last() {
                Some(last) => format!("every provider failed; last: {last}"),
                None => "no certificate providers configured".to_string(),
            },
        ))
    }
}
