use serde::{Deserialize, Serialize};

/// How guidance text is produced for a persona.
///
/// - `Guided`: Phase guidance and chat replies come from the dialogue service
///   and are narrated with the persona's voice.
/// - `SelfGuided`: Fixed local prompts, no replies, no narration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceMode {
    Guided,
    SelfGuided,
}

impl GuidanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guided => "guided",
            Self::SelfGuided => "self_guided",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "guided" => Some(Self::Guided),
            "self_guided" | "self" => Some(Self::SelfGuided),
            _ => None,
        }
    }
}

/// A named coaching voice and style.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    /// Stable identifier used by clients, e.g. `sage_mira`.
    pub key: String,
    /// Full display name shown when choosing a guide.
    pub name: String,
    /// Short name used in chat bubbles and on the certificate.
    pub label: String,
    /// Style description fed into the system prompt.
    pub style: String,
    /// Narration voice. `None` means the persona is silent.
    pub voice: Option<String>,
    pub mode: GuidanceMode,
}

struct BuiltinPersona {
    key: &'static str,
    name: &'static str,
    label: &'static str,
    style: &'static str,
    voice: Option<&'static str>,
    mode: GuidanceMode,
}

const BUILTIN: [BuiltinPersona; 6] = [
    BuiltinPersona {
        key: "self_guided",
        name: "Self-guided (silent, user-led)",
        label: "Self-guided",
        style: "Silent prompts only. No voice. You lead your own pace.",
        voice: None,
        mode: GuidanceMode::SelfGuided,
    },
    BuiltinPersona {
        key: "sage_arjun",
        name: "Sage Arjun (guru, talkative, he/him)",
        label: "Sage Arjun",
        style: "Warm, guru-like, gentle metaphors, kind encouragement, patient rhythm.",
        voice: Some("verse"),
        mode: GuidanceMode::Guided,
    },
    BuiltinPersona {
        key: "sage_mira",
        name: "Sage Mira (guru, talkative, she/her)",
        label: "Sage Mira",
        style: "Nurturing, soothing cadence, ocean and moonlight imagery, soft compassion.",
        voice: Some("coral"),
        mode: GuidanceMode::Guided,
    },
    BuiltinPersona {
        key: "coach_theo",
        name: "Coach Theo (concise instructor, he/him)",
        label: "Coach Theo",
        style: "Concise instructor, minimal words, crisp steps, neutral tone.",
        voice: Some("alloy"),
        mode: GuidanceMode::Guided,
    },
    BuiltinPersona {
        key: "coach_ana",
        name: "Coach Ana (concise instructor, she/her)",
        label: "Coach Ana",
        style: "Clear pacing, pragmatic, supportive, minimal commentary.",
        voice: Some("shimmer"),
        mode: GuidanceMode::Guided,
    },
    BuiltinPersona {
        key: "zorblax",
        name: "Zorblax (alien/gorilla guide)",
        label: "Zorblax",
        style: "Playful non-human guide. Friendly, soft hums (hrrr, mmm), whimsical imagery.",
        voice: Some("ash"),
        mode: GuidanceMode::Guided,
    },
];

impl From<&BuiltinPersona> for Persona {
    fn from(p: &BuiltinPersona) -> Self {
        Self {
            key: p.key.to_string(),
            name: p.name.to_string(),
            label: p.label.to_string(),
            style: p.style.to_string(),
            voice: p.voice.map(str::to_string),
            mode: p.mode,
        }
    }
}

impl Persona {
    /// All built-in personas, self-guided first.
    pub fn catalog() -> Vec<Persona> {
        BUILTIN.iter().map(Persona::from).collect()
    }

    /// Look up a built-in persona by key or by display name.
    pub fn find(key: &str) -> Option<Persona> {
        BUILTIN
            .iter()
            .find(|p| p.key == key || p.name == key)
            .map(Persona::from)
    }

    pub fn self_guided() -> Persona {
        Persona::from(&BUILTIN[0])
    }

    pub fn is_self_guided(&self) -> bool {
        self.mode == GuidanceMode::SelfGuided
    }

    /// The voice to narrate with, if this persona speaks at all.
    pub fn narration_voice(&self) -> Option<&str> {
        if self.is_self_guided() {
            return None;
        }
        self.voice.as_deref().filter(|v| !v.trim().is_empty())
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::self_guided()
    }
}
