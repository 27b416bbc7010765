//! Certificates drawn in-process, with a note written by the dialogue service.

use std::sync::Arc;

use async_trait::async_trait;
use om_core::guidance;

use super::pdf::CertificatePage;
use super::{CertificateProvider, CertificateRequest};
use crate::services::{DialogueService, Sampling, ServiceError};

pub struct LocalCertificate {
    dialogue: Arc<dyn DialogueService>,
    sampling: Sampling,
}

impl LocalCertificate {
    pub fn new(dialogue: Arc<dyn DialogueService>, sampling: Sampling) -> Self {
        Self { dialogue, sampling }
    }

    /// A personal note from the guide. Falls back to a fixed note when the
    /// dialogue service fails, so this never errors.
    pub async fn write_note(&self, request: &CertificateRequest) -> String {
        let system = guidance::certificate_system_prompt(&request.persona_label, &request.persona_style);
        let prompt = guidance::certificate_user_prompt(
            &request.intent,
            &request.mantra,
            request.minutes,
            &request.transcript,
        );

        let note = match self
            .dialogue
            .reply(&system, &[om_core::Turn::user(prompt)], Some(self.sampling))
            .await
        {
            Ok(note) => note,
            Err(e) => {
                tracing::warn!("Certificate note unavailable, using fallback: {}", e);
                guidance::fallback_certificate_note(
                    &request.intent,
                    &request.mantra,
                    &request.persona_label,
                )
            }
        };
        guidance::normalize_quotes(&note)
    }
}

#[async_trait]
impl CertificateProvider for LocalCertificate {
    fn name(&self) -> &str {
        "local certificate"
    }

    async fn render(&self, request: &CertificateRequest) -> Result<Vec<u8>, ServiceError> {
        let body = self.write_note(request).await;
        let subtitle = guidance::normalize_quotes(&request.subtitle());
        let page = CertificatePage {
            title: guidance::CERTIFICATE_TITLE,
            subtitle: &subtitle,
            body: &body,
            signature: &request.persona_label,
        };
        Ok(page.render())
    }
}
