//! Application configuration.
//!
//! Values are layered, later layers winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config <path>`, or `om.toml` in the platform config directory)
//! 3. Environment variables:
//!    - `OPENAI_API_KEY`, `OPENAI_BASE_URL`
//!    - `OM_CHAT_MODEL`, `OM_TTS_MODEL`
//!    - `OM_REPORT_AGENT_URL` (empty disables the remote agent)
//!    - `OM_API_KEY`, `OM_CORS_ORIGINS` (comma-separated)
//!    - `OM_TICK_MS`
//! 4. Command-line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8704;
pub const DEFAULT_REPORT_AGENT_URL: &str = "http://localhost:8088/report";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub session: SessionSettings,
    pub certificate: CertificateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Bearer token required on every API request when set.
    pub api_key: Option<String>,
    /// Allowed CORS origins. Permissive when unset.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            cors_origins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            temperature: 0.5,
            max_tokens: 400,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Period of the automatic phase check.
    pub tick_interval_ms: u64,
    /// Recent turns sent with each chat request.
    pub dialogue_window: usize,
    /// Recent turns handed to certificate generation.
    pub certificate_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            dialogue_window: 12,
            certificate_window: 12,
        }
    }
}

impl SessionSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Certificate providers, in the order they appear in `providers`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Remote report agent over HTTP.
    Agent,
    /// PDF drawn in-process.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    pub providers: Vec<ProviderKind>,
    pub agent_url: Option<String>,
    pub agent_timeout_secs: u64,
    pub note_temperature: f32,
    pub note_max_tokens: u32,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            providers: vec![ProviderKind::Agent, ProviderKind::Local],
            agent_url: Some(DEFAULT_REPORT_AGENT_URL.to_string()),
            agent_timeout_secs: 45,
            note_temperature: 0.7,
            note_max_tokens: 650,
        }
    }
}

impl AppConfig {
    /// Load from an explicit file, or the default location if it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "om").map(|dirs| dirs.config_dir().join("om.toml"))
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = non_empty("OM_CHAT_MODEL") {
            self.openai.chat_model = v;
        }
        if let Some(v) = non_empty("OM_TTS_MODEL") {
            self.openai.tts_model = v;
        }
        if let Some(v) = lookup("OM_REPORT_AGENT_URL") {
            let v = v.trim();
            self.certificate.agent_url = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = non_empty("OM_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = non_empty("OM_CORS_ORIGINS") {
            self.server.cors_origins = Some(v.split(',').map(|s| s.trim().to_string()).collect());
        }
        if let Some(ms) = non_empty("OM_TICK_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.session.tick_interval_ms = ms;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.address, self.server.port)
    }
}
