use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The stated purpose of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Intent {
    #[default]
    #[serde(rename = "stress relief")]
    StressRelief,
    #[serde(rename = "sleep")]
    Sleep,
    #[serde(rename = "focus")]
    Focus,
    #[serde(rename = "self-compassion")]
    SelfCompassion,
    #[serde(rename = "resilience")]
    Resilience,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::StressRelief,
        Intent::Sleep,
        Intent::Focus,
        Intent::SelfCompassion,
        Intent::Resilience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StressRelief => "stress relief",
            Self::Sleep => "sleep",
            Self::Focus => "focus",
            Self::SelfCompassion => "self-compassion",
            Self::Resilience => "resilience",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str().replace('-', " ") == normalized)
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::from_str(s).ok_or_else(|| CoreError::UnknownIntent(s.to_string()))
    }

    /// The mantra offered when the user has not written their own.
    pub fn default_mantra(&self) -> &'static str {
        match self {
            Self::StressRelief => "I am safe; I can soften.",
            Self::Sleep => "Rest is here.",
            Self::Focus => "Steady and clear.",
            Self::SelfCompassion => "May I be kind.",
            Self::Resilience => "I can meet this.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_slugs() {
        assert_eq!(Intent::from_str("stress relief"), Some(Intent::StressRelief));
        assert_eq!(Intent::from_str("stress_relief"), Some(Intent::StressRelief));
        assert_eq!(Intent::from_str("Self-Compassion"), Some(Intent::SelfCompassion));
        assert_eq!(Intent::from_str("self compassion"), Some(Intent::SelfCompassion));
        assert!(Intent::parse("napping").is_err());
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&Intent::SelfCompassion).unwrap();
        assert_eq!(json, "\"self-compassion\"");
        let back: Intent = serde_json::from_str("\"stress relief\"").unwrap();
        assert_eq!(back, Intent::StressRelief);
    }

    #[test]
    fn every_intent_has_a_mantra() {
        for intent in Intent::ALL {
            assert!(!intent.default_mantra().is_empty());
        }
    }
}
