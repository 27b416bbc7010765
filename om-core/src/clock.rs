use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock bounds of a running session.
///
/// Elapsed time is always derived from `now`, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClock {
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl SessionClock {
    /// Start a clock at `now`. A zero length is bumped to one second so that
    /// `ends_at > started_at` always holds.
    pub fn start(now: DateTime<Utc>, total_secs: u64) -> Self {
        let total = total_secs.clamp(1, u64::from(u32::MAX)) as i64;
        Self {
            started_at: now,
            ends_at: now + Duration::seconds(total),
        }
    }

    pub fn total_secs(&self) -> u64 {
        (self.ends_at - self.started_at).num_seconds().max(0) as u64
    }

    /// Seconds since start, clamped to `[0, total]`.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
        elapsed.min(self.total_secs())
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.total_secs() - self.elapsed_secs(now)
    }

    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Timer label in the form `MM:SS / MM:SS`.
    pub fn label(&self, now: DateTime<Utc>) -> String {
        format!(
            "{} / {}",
            format_mmss(self.elapsed_secs(now)),
            format_mmss(self.total_secs())
        )
    }
}

pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
