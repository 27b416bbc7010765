//! Live sessions: the phase controller wired to dialogue, narration and
//! certificate services, one per client.

mod coach;
mod outbox;
mod registry;

use om_core::CoreError;
use thiserror::Error;

use crate::services::ServiceError;

pub use coach::{CoachSession, PhaseView, SessionSnapshot, TimerView};
pub use outbox::{AudioClip, Notification, NotificationLevel};
pub use registry::{Clock, SessionRegistry, SharedSession, SystemClock};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error(transparent)]
    Setup(#[from] CoreError),

    #[error("The certificate is available once the session has finished")]
    CertificateNotReady,

    #[error("Certificate could not be produced: {0}")]
    Certificate(#[from] ServiceError),
}
