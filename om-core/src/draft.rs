use serde::{Deserialize, Serialize};

use crate::config::{resolve_mantra, validate_minutes};
use crate::{CoreError, Intent, Persona, SessionConfig, DEFAULT_MINUTES};

/// The four screens a user walks through before and during a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    Guide,
    Intent,
    Duration,
    Session,
}

impl SetupStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::Guide => 1,
            Self::Intent => 2,
            Self::Duration => 3,
            Self::Session => 4,
        }
    }

    fn previous(&self) -> Self {
        match self {
            Self::Guide | Self::Intent => Self::Guide,
            Self::Duration => Self::Intent,
            Self::Session => Self::Duration,
        }
    }
}

/// Choices collected during setup.
///
/// The mantra follows the selected intent's default until the user edits it
/// to something else; from then on intent changes leave it alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDraft {
    pub step: SetupStep,
    pub persona: Persona,
    pub intent: Intent,
    pub mantra: String,
    pub mantra_customized: bool,
    pub minutes: u32,
}

impl Default for SessionDraft {
    fn default() -> Self {
        let intent = Intent::default();
        Self {
            step: SetupStep::Guide,
            persona: Persona::self_guided(),
            intent,
            mantra: intent.default_mantra().to_string(),
            mantra_customized: false,
            minutes: DEFAULT_MINUTES,
        }
    }
}

impl SessionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft already on the session screen, as if the user had walked the
    /// setup steps to produce `config`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            step: SetupStep::Session,
            persona: config.persona.clone(),
            intent: config.intent,
            mantra: config.mantra.clone(),
            mantra_customized: config.mantra != config.intent.default_mantra(),
            minutes: config.minutes,
        }
    }

    /// Step 1: pick a guide and continue.
    pub fn select_persona(&mut self, key: &str) -> Result<(), CoreError> {
        self.expect_step(SetupStep::Guide)?;
        self.persona =
            Persona::find(key).ok_or_else(|| CoreError::UnknownPersona(key.to_string()))?;
        self.step = SetupStep::Intent;
        Ok(())
    }

    /// Step 2: change the intent without continuing.
    pub fn set_intent(&mut self, intent: Intent) -> Result<(), CoreError> {
        self.expect_step(SetupStep::Intent)?;
        self.intent = intent;
        if !self.mantra_customized {
            self.mantra = intent.default_mantra().to_string();
        }
        Ok(())
    }

    /// Step 2: edit the mantra without continuing.
    pub fn set_mantra(&mut self, mantra: &str) -> Result<(), CoreError> {
        self.expect_step(SetupStep::Intent)?;
        let default = self.intent.default_mantra();
        let edited = mantra.trim();
        self.mantra_customized = !edited.is_empty() && edited != default;
        self.mantra = resolve_mantra(self.intent, Some(edited));
        Ok(())
    }

    /// Step 2: continue with the current intent and mantra.
    pub fn confirm_intent(&mut self) -> Result<(), CoreError> {
        self.expect_step(SetupStep::Intent)?;
        self.mantra = resolve_mantra(self.intent, Some(&self.mantra));
        self.step = SetupStep::Duration;
        Ok(())
    }

    /// Step 3: pick a session length and continue to the session screen.
    pub fn set_minutes(&mut self, minutes: u32) -> Result<(), CoreError> {
        self.expect_step(SetupStep::Duration)?;
        validate_minutes(minutes)?;
        self.minutes = minutes;
        self.step = SetupStep::Session;
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = self.step.previous();
    }

    /// The config to start a session with. Only available on the session screen.
    pub fn to_config(&self) -> Result<SessionConfig, CoreError> {
        if self.step != SetupStep::Session {
            return Err(CoreError::SetupIncomplete(self.step.number()));
        }
        SessionConfig::new(
            self.persona.clone(),
            self.intent,
            Some(&self.mantra),
            self.minutes,
        )
    }

    /// The config the current choices describe, whatever the step.
    pub fn preview(&self) -> SessionConfig {
        SessionConfig {
            persona: self.persona.clone(),
            intent: self.intent,
            mantra: resolve_mantra(self.intent, Some(&self.mantra)),
            minutes: self.minutes,
        }
    }

    fn expect_step(&self, expected: SetupStep) -> Result<(), CoreError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CoreError::WrongStep {
                expected: expected.number(),
                actual: self.step.number(),
            })
        }
    }
}
