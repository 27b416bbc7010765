//! Client for the remote report agent that renders certificates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Serialize;

use super::{CertificateProvider, CertificateRequest};
use crate::services::ServiceError;

const SERVICE: &str = "report agent";

/// Posts the session summary to an HTTP endpoint that answers with a PDF.
#[derive(Debug, Clone)]
pub struct RemoteReportAgent {
    client: Client,
    url: String,
    timeout: Duration,
}

impl RemoteReportAgent {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Body expected by the report agent.
#[derive(Debug, Serialize)]
struct ReportPayload<'a> {
    persona_label: &'a str,
    persona_style: &'a str,
    intent: &'a str,
    mantra: &'a str,
    minutes: u32,
    chat: Vec<ReportTurn<'a>>,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct ReportTurn<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a CertificateRequest> for ReportPayload<'a> {
    fn from(request: &'a CertificateRequest) -> Self {
        Self {
            persona_label: &request.persona_label,
            persona_style: &request.persona_style,
            intent: &request.intent,
            mantra: &request.mantra,
            minutes: request.minutes,
            chat: request
                .transcript
                .iter()
                .map(|t| ReportTurn {
                    role: t.role.as_str(),
                    content: &t.content,
                })
                .collect(),
            format: "pdf",
        }
    }
}

#[async_trait]
impl CertificateProvider for RemoteReportAgent {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn render(&self, request: &CertificateRequest) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&ReportPayload::from(request))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if status == StatusCode::OK && content_type.contains("application/pdf") {
            return Ok(response.bytes().await?.to_vec());
        }

        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(ServiceError::unavailable(
            SERVICE,
            format!("agent responded {}: {}", status, snippet),
        ))
    }
}
