use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use om_core::{
    guidance, AdvanceOutcome, PhaseController, PhaseEntry, SessionConfig, SessionDraft,
    TickOutcome, Transcript, Turn,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::outbox::{self, SharedOutbox};
use super::{AudioClip, Notification, NotificationLevel, SessionError};
use crate::config::SessionSettings;
use crate::services::{CertificateRequest, Services};

/// One client's meditation session.
///
/// Wraps the [`PhaseController`] with everything that happens around a phase
/// change: fetching guidance, recording it in the transcript, narrating it,
/// and producing the certificate once the session is over.
pub struct CoachSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    draft: SessionDraft,
    controller: PhaseController,
    transcript: Transcript,
    outbox: SharedOutbox,
    narrations: JoinSet<()>,
    certificate: Option<Arc<Vec<u8>>>,
    services: Services,
    settings: SessionSettings,
}

impl CoachSession {
    pub fn new(id: Uuid, services: Services, settings: SessionSettings, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            draft: SessionDraft::new(),
            controller: PhaseController::new(),
            transcript: Transcript::new(),
            outbox: SharedOutbox::default(),
            narrations: JoinSet::new(),
            certificate: None,
            services,
            settings,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn draft(&self) -> &SessionDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SessionDraft {
        &mut self.draft
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Start a session from the setup draft.
    pub async fn start_from_draft(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let config = self.draft.to_config()?;
        self.start(config, now).await;
        Ok(())
    }

    /// Start (or restart) with `config`. Clears the transcript, queued audio,
    /// pending notifications and any earlier certificate, then emits opening
    /// guidance.
    pub async fn start(&mut self, config: SessionConfig, now: DateTime<Utc>) {
        self.narrations.abort_all();
        outbox::lock(&self.outbox).reset();
        self.transcript.clear();
        self.certificate = None;
        self.draft = SessionDraft::from_config(&config);

        tracing::info!(
            session = %self.id,
            persona = %config.persona.key,
            intent = config.intent.as_str(),
            minutes = config.minutes,
            "Session started"
        );
        let entry = self.controller.start(config, now);
        self.enter_phase(entry).await;
    }

    /// Check the clock and advance or finish when due.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let outcome = self.controller.tick(now);
        match outcome {
            TickOutcome::Advanced { entry, elapsed } => {
                tracing::debug!(session = %self.id, phase = entry.index, elapsed, "Phase advanced on schedule");
                self.enter_phase(entry).await;
            }
            TickOutcome::Finished { total } => {
                tracing::info!(session = %self.id, total, "Session finished");
                self.notify(
                    NotificationLevel::Info,
                    "Session completed. You can download your certificate.",
                );
            }
            TickOutcome::Idle | TickOutcome::Waiting { .. } | TickOutcome::AlreadyFinished => {}
        }
        outcome
    }

    /// Move to the next phase on request.
    pub async fn advance(&mut self) -> AdvanceOutcome {
        let outcome = self.controller.advance();
        match outcome {
            AdvanceOutcome::Advanced(entry) => {
                tracing::debug!(session = %self.id, phase = entry.index, "Phase advanced manually");
                self.enter_phase(entry).await;
            }
            AdvanceOutcome::NoFurtherPhases => {
                self.notify(NotificationLevel::Info, "All phases complete.");
            }
            AdvanceOutcome::NotRunning => {
                self.notify(NotificationLevel::Info, "No session is running.");
            }
        }
        outcome
    }

    /// Record a user message and, for guided personas, ask the guide to reply.
    ///
    /// Returns the reply if one was added.
    pub async fn send_message(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.transcript.push_user(text);

        let config = self.active_config();
        if config.is_self_guided() {
            return None;
        }

        let system = guidance::system_prompt(&config);
        let recent = self.transcript.recent(self.settings.dialogue_window);
        match self.services.dialogue.reply(&system, recent, None).await {
            Ok(reply) => {
                self.transcript.push_assistant(reply.clone(), None);
                self.narrate(&config, reply.clone());
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(session = %self.id, "Chat reply failed: {}", e);
                self.notify(NotificationLevel::Error, format!("Guide unavailable: {e}"));
                None
            }
        }
    }

    /// Narrate the most recent guidance again. Returns whether narration was requested.
    pub fn repeat(&mut self) -> bool {
        let config = self.active_config();
        if config.voice().is_none() {
            self.notify(NotificationLevel::Info, "Self-guided mode: no voice to repeat.");
            return false;
        }
        match self.transcript.last_assistant() {
            Some(turn) => {
                let text = turn.content.clone();
                self.narrate(&config, text);
                true
            }
            None => {
                self.notify(NotificationLevel::Info, "Nothing to repeat yet.");
                false
            }
        }
    }

    /// The session's certificate PDF, rendered on first request after the
    /// session has finished and cached until the next start.
    pub async fn certificate(&mut self, issued_on: NaiveDate) -> Result<Arc<Vec<u8>>, SessionError> {
        if !self.controller.is_finished() {
            return Err(SessionError::CertificateNotReady);
        }
        if let Some(pdf) = &self.certificate {
            return Ok(pdf.clone());
        }
        let config = self
            .controller
            .config()
            .ok_or(SessionError::CertificateNotReady)?;

        let request = CertificateRequest::new(
            config,
            &self.transcript,
            self.settings.certificate_window,
            issued_on,
        );
        let rendered = self.services.certificates.render(&request).await?;
        for warning in rendered.warnings {
            self.notify(NotificationLevel::Warning, warning);
        }

        let pdf = Arc::new(rendered.pdf);
        self.certificate = Some(pdf.clone());
        Ok(pdf)
    }

    pub fn certificate_available(&self) -> bool {
        self.controller.is_finished()
    }

    /// Take the next narrated clip, if any.
    pub fn next_clip(&self) -> Option<AudioClip> {
        outbox::lock(&self.outbox).next_clip()
    }

    /// Wait for in-flight narration to land in the outbox.
    pub async fn settle_narration(&mut self) {
        while self.narrations.join_next().await.is_some() {}
    }

    /// Current view of the session. Pending notifications are handed over
    /// and cleared.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let (notifications, pending_audio) = {
            let mut outbox = outbox::lock(&self.outbox);
            (outbox.drain_notifications(), outbox.pending_clips())
        };

        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            state: self.controller.state().as_str().to_string(),
            phase: self.controller.phase_index().map(|index| {
                let phase = &om_core::PHASES[index];
                PhaseView {
                    index,
                    title: phase.title.to_string(),
                    goals: phase.goals.to_string(),
                }
            }),
            can_advance: self.controller.can_advance(),
            timer: self
                .controller
                .clock()
                .zip(self.controller.schedule())
                .map(|(clock, schedule)| TimerView {
                    elapsed_secs: clock.elapsed_secs(now),
                    total_secs: clock.total_secs(),
                    label: clock.label(now),
                    thresholds: schedule.thresholds(),
                }),
            config: self.controller.config().cloned(),
            draft: self.draft.clone(),
            transcript: self.transcript.turns().to_vec(),
            notifications,
            pending_audio,
            certificate_available: self.certificate_available(),
        }
    }

    /// Emit exactly one guidance entry for a newly entered phase.
    async fn enter_phase(&mut self, entry: PhaseEntry) {
        let Some(config) = self.controller.config().cloned() else {
            return;
        };

        let text = if config.is_self_guided() {
            guidance::self_guided_text(entry.index, &config.mantra)
        } else {
            let system = guidance::system_prompt(&config);
            let prompt = Turn::user(guidance::phase_prompt(entry.index, &config.mantra));
            match self.services.dialogue.reply(&system, &[prompt], None).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(session = %self.id, phase = entry.index, "Phase guidance failed: {}", e);
                    self.notify(
                        NotificationLevel::Error,
                        format!("Phase guidance unavailable, showing written prompts instead. ({e})"),
                    );
                    guidance::self_guided_text(entry.index, &config.mantra)
                }
            }
        };

        self.transcript.push_assistant(text.clone(), Some(entry.phase.title));
        self.narrate(&config, text);
    }

    /// Synthesize `text` in the background and queue the clip. Silent
    /// personas are never narrated.
    fn narrate(&mut self, config: &SessionConfig, text: String) {
        let Some(voice) = config.voice().map(str::to_string) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }

        while self.narrations.try_join_next().is_some() {}

        let narration = self.services.narration.clone();
        let outbox = self.outbox.clone();
        let epoch = outbox::lock(&outbox).epoch();
        let session_id = self.id;

        self.narrations.spawn(async move {
            match narration.synthesize(&text, &voice).await {
                Ok(audio) if audio.is_empty() => {}
                Ok(audio) => {
                    if !outbox::lock(&outbox).push_clip(epoch, audio) {
                        tracing::debug!(session = %session_id, "Dropped narration from a previous start");
                    }
                }
                Err(e) => {
                    tracing::warn!(session = %session_id, "Narration failed: {}", e);
                    outbox::lock(&outbox).notify_for(
                        epoch,
                        NotificationLevel::Error,
                        format!("Narration failed: {e}"),
                    );
                }
            }
        });
    }

    /// Config of the running or last session, or what the draft describes
    /// before anything has started.
    fn active_config(&self) -> SessionConfig {
        self.controller
            .config()
            .cloned()
            .unwrap_or_else(|| self.draft.preview())
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        outbox::lock(&self.outbox).notify(level, message);
    }
}

impl Drop for CoachSession {
    fn drop(&mut self) {
        self.narrations.abort_all();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseView {
    pub index: usize,
    pub title: String,
    pub goals: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerView {
    pub elapsed_secs: u64,
    pub total_secs: u64,
    /// `MM:SS / MM:SS`
    pub label: String,
    pub thresholds: [u64; 3],
}

/// Everything a client needs to render a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// `idle`, `running` or `finished`.
    pub state: String,
    pub phase: Option<PhaseView>,
    pub can_advance: bool,
    pub timer: Option<TimerView>,
    pub config: Option<SessionConfig>,
    pub draft: SessionDraft,
    pub transcript: Vec<Turn>,
    pub notifications: Vec<Notification>,
    pub pending_audio: usize,
    pub certificate_available: bool,
}
