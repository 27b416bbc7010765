//! OpenAI REST client for chat completions and speech synthesis.

use std::time::Duration;

use async_trait::async_trait;
use om_core::Turn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{DialogueService, NarrationService, Sampling, ServiceError};
use crate::config::OpenAiConfig;

const DIALOGUE: &str = "dialogue service";
const NARRATION: &str = "narration service";

/// Client for the OpenAI HTTP API. Serves as both the dialogue and the
/// narration service.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    tts_model: String,
    sampling: Sampling,
}

impl OpenAiClient {
    pub fn from_config(config: &OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chat_model: config.chat_model.clone(),
            tts_model: config.tts_model.clone(),
            sampling: Sampling {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        }
    }

    fn post(&self, service: &'static str, path: &str) -> Result<reqwest::RequestBuilder, ServiceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::unavailable(service, "OPENAI_API_KEY is not configured"))?;
        Ok(self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(key))
    }

    /// Convert a non-success status into an error carrying the response body.
    async fn check_status(
        service: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::unavailable(
            service,
            format!("{}: {}", status, truncate(&body, 200)),
        ))
    }
}

#[async_trait]
impl DialogueService for OpenAiClient {
    async fn reply(
        &self,
        system: &str,
        turns: &[Turn],
        sampling: Option<Sampling>,
    ) -> Result<String, ServiceError> {
        let sampling = sampling.unwrap_or(self.sampling);
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
        messages.extend(turns.iter().map(|t| ChatMessage {
            role: t.role.as_str(),
            content: &t.content,
        }));

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            messages,
        };

        let response = self
            .post(DIALOGUE, "/chat/completions")?
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(DIALOGUE, response).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ServiceError::unexpected(DIALOGUE, "reply contained no text"))
    }
}

#[async_trait]
impl NarrationService for OpenAiClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError> {
        if text.trim().is_empty() || voice.trim().is_empty() {
            return Ok(Vec::new());
        }

        let request = SpeechRequest {
            model: &self.tts_model,
            voice,
            input: text,
        };

        let response = self
            .post(NARRATION, "/audio/speech")?
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(NARRATION, response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}
