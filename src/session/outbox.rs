use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the user. Failures of external services surface here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// A narrated clip waiting to be played.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Increases with every clip queued in a session; playback follows this order.
    pub sequence: u64,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Output a session produces outside the request/response cycle.
///
/// Narration finishes on spawned tasks, so clips and narration errors are
/// delivered here instead of through the session itself. Each start bumps the
/// epoch; anything arriving for an older epoch is discarded.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    epoch: u64,
    next_sequence: u64,
    clips: VecDeque<AudioClip>,
    notifications: Vec<Notification>,
}

pub(crate) type SharedOutbox = Arc<Mutex<Outbox>>;

pub(crate) fn lock(outbox: &SharedOutbox) -> MutexGuard<'_, Outbox> {
    outbox.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Outbox {
    /// Drop queued clips and messages and start a new epoch.
    pub fn reset(&mut self) -> u64 {
        self.epoch += 1;
        self.clips.clear();
        self.notifications.clear();
        self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }

    /// Notify only if `epoch` is still current.
    pub fn notify_for(&mut self, epoch: u64, level: NotificationLevel, message: impl Into<String>) {
        if epoch == self.epoch {
            self.notify(level, message);
        }
    }

    /// Queue a clip behind any others. Returns false if the clip is stale.
    pub fn push_clip(&mut self, epoch: u64, bytes: Vec<u8>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.next_sequence += 1;
        self.clips.push_back(AudioClip {
            sequence: self.next_sequence,
            mime_type: "audio/mpeg",
            bytes,
        });
        true
    }

    pub fn next_clip(&mut self) -> Option<AudioClip> {
        self.clips.pop_front()
    }

    pub fn pending_clips(&self) -> usize {
        self.clips.len()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
