use serde::{Deserialize, Serialize};

use crate::{CoreError, Intent, Persona};

pub const MIN_MINUTES: u32 = 5;
pub const MAX_MINUTES: u32 = 45;
pub const DEFAULT_MINUTES: u32 = 10;

/// Everything a session needs to run, fixed for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub persona: Persona,
    pub intent: Intent,
    pub mantra: String,
    pub minutes: u32,
}

impl SessionConfig {
    /// Build a config, falling back to the intent's default mantra when the
    /// given one is missing or blank.
    pub fn new(
        persona: Persona,
        intent: Intent,
        mantra: Option<&str>,
        minutes: u32,
    ) -> Result<Self, CoreError> {
        validate_minutes(minutes)?;
        Ok(Self {
            persona,
            intent,
            mantra: resolve_mantra(intent, mantra),
            minutes,
        })
    }

    pub fn from_keys(
        persona_key: &str,
        intent: Intent,
        mantra: Option<&str>,
        minutes: u32,
    ) -> Result<Self, CoreError> {
        let persona = Persona::find(persona_key)
            .ok_or_else(|| CoreError::UnknownPersona(persona_key.to_string()))?;
        Self::new(persona, intent, mantra, minutes)
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.minutes) * 60
    }

    pub fn voice(&self) -> Option<&str> {
        self.persona.narration_voice()
    }

    pub fn is_self_guided(&self) -> bool {
        self.persona.is_self_guided()
    }
}

/// Wire form of a session config, naming the persona by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfigInput {
    pub persona: String,
    pub intent: Intent,
    #[serde(default)]
    pub mantra: Option<String>,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
}

fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}

impl TryFrom<SessionConfigInput> for SessionConfig {
    type Error = CoreError;

    fn try_from(input: SessionConfigInput) -> Result<Self, Self::Error> {
        SessionConfig::from_keys(
            &input.persona,
            input.intent,
            input.mantra.as_deref(),
            input.minutes,
        )
    }
}

pub(crate) fn validate_minutes(minutes: u32) -> Result<(), CoreError> {
    if (MIN_MINUTES..=MAX_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(CoreError::DurationOutOfRange {
            minutes,
            min: MIN_MINUTES,
            max: MAX_MINUTES,
        })
    }
}

pub(crate) fn resolve_mantra(intent: Intent, mantra: Option<&str>) -> String {
    match mantra.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => intent.default_mantra().to_string(),
    }
}
