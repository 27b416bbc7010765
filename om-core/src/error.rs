use thiserror::Error;

/// Errors raised while configuring a session.
///
/// None of these are produced once a session is running: the controller
/// reports outcomes instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Session length must be between {min} and {max} minutes, got {minutes}")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },

    #[error("Setup is on step {actual}, this action belongs to step {expected}")]
    WrongStep { expected: u8, actual: u8 },

    #[error("Setup is not finished (currently on step {0})")]
    SetupIncomplete(u8),
}
