//! In-memory collaborators for driving sessions without a network.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use om_coach::config::SessionSettings;
use om_coach::services::{
    pdf::CertificatePage, CertificateChain, CertificateProvider, CertificateRequest,
    DialogueService, NarrationService, Sampling, ServiceError, Services,
};
use om_coach::session::Clock;
use om_core::Turn;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// A recorded dialogue request.
#[derive(Debug, Clone)]
pub struct DialogueCall {
    pub system: String,
    pub turns: Vec<Turn>,
    pub sampling: Option<Sampling>,
}

/// Echoes the last turn back, or fails while `failing` is set.
#[derive(Default)]
pub struct FakeDialogue {
    pub calls: Mutex<Vec<DialogueCall>>,
    pub failing: AtomicBool,
}

impl FakeDialogue {
    pub fn failing() -> Self {
        let fake = Self::default();
        fake.failing.store(true, Ordering::SeqCst);
        fake
    }

    pub fn calls(&self) -> Vec<DialogueCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueService for FakeDialogue {
    async fn reply(
        &self,
        system: &str,
        turns: &[Turn],
        sampling: Option<Sampling>,
    ) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push(DialogueCall {
            system: system.to_string(),
            turns: turns.to_vec(),
            sampling,
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::unavailable("dialogue service", "offline"));
        }
        let last = turns.last().map(|t| t.content.as_str()).unwrap_or_default();
        Ok(format!("Guide: {}", last.lines().next().unwrap_or_default()))
    }
}

/// Returns a few fake MP3 bytes per request and remembers the voices used.
#[derive(Default)]
pub struct FakeNarration {
    pub requests: AtomicUsize,
    pub voices: Mutex<Vec<String>>,
    pub failing: AtomicBool,
}

impl FakeNarration {
    pub fn count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrationService for FakeNarration {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().unwrap().push(voice.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::unavailable("narration service", "no audio today"));
        }
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(audio)
    }
}

/// Renders a small real PDF without touching the dialogue service.
pub struct PlainCertificate;

#[async_trait]
impl CertificateProvider for PlainCertificate {
    fn name(&self) -> &str {
        "plain certificate"
    }

    async fn render(&self, request: &CertificateRequest) -> Result<Vec<u8>, ServiceError> {
        Ok(CertificatePage {
            title: "Certificate",
            subtitle: &request.intent,
            body: &request.mantra,
            signature: &request.persona_label,
        }
        .render())
    }
}

/// Always fails, like an unreachable report agent.
pub struct BrokenAgent;

#[async_trait]
impl CertificateProvider for BrokenAgent {
    fn name(&self) -> &str {
        "report agent"
    }

    async fn render(&self, _: &CertificateRequest) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::unavailable("report agent", "connection refused"))
    }
}

/// Answers with something that is not a PDF.
pub struct HtmlAgent;

#[async_trait]
impl CertificateProvider for HtmlAgent {
    fn name(&self) -> &str {
        "html agent"
    }

    async fn render(&self, _: &CertificateRequest) -> Result<Vec<u8>, ServiceError> {
        Ok(b"<html>oops</html>".to_vec())
    }
}

pub struct Fakes {
    pub dialogue: Arc<FakeDialogue>,
    pub narration: Arc<FakeNarration>,
    pub services: Services,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_providers(vec![Arc::new(PlainCertificate)])
    }

    pub fn with_providers(providers: Vec<Arc<dyn CertificateProvider>>) -> Self {
        Self::build(Arc::new(FakeDialogue::default()), providers)
    }

    pub fn build(
        dialogue: Arc<FakeDialogue>,
        providers: Vec<Arc<dyn CertificateProvider>>,
    ) -> Self {
        let narration = Arc::new(FakeNarration::default());
        let services = Services::new(
            dialogue.clone(),
            narration.clone(),
            Arc::new(CertificateChain::new(providers)),
        );
        Self {
            dialogue,
            narration,
            services,
        }
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        tick_interval_ms: 10,
        ..SessionSettings::default()
    }
}

/// A clock tests move by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
