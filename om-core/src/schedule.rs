use serde::Serialize;

/// One of the four fixed stages of a session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Phase {
    pub title: &'static str,
    /// What the guide should cover during this phase.
    pub goals: &'static str,
}

pub const PHASES: [Phase; 4] = [
    Phase {
        title: "Opening & Intention",
        goals: "Welcome, posture, centering breath. Name intent and introduce the mantra.",
    },
    Phase {
        title: "Breath & Mantra",
        goals: "Guide a calm breath cadence and weave in the mantra for 1-2 minutes.",
    },
    Phase {
        title: "Body Scan & Kind Wish",
        goals: "Soft scan from head to toe; invite a kind wish using the mantra.",
    },
    Phase {
        title: "Closing & Integration",
        goals: "Gently return. Offer one simple action to carry the calm into the day.",
    },
];

/// Index of the closing phase.
pub const LAST_PHASE: usize = PHASES.len() - 1;

/// When each phase hands over to the next.
///
/// The session is split into equal quarters: `thresholds[i]` is the elapsed
/// second at which phase `i` advances to phase `i + 1`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PhaseSchedule {
    total_secs: u64,
    thresholds: [u64; 3],
}

impl PhaseSchedule {
    pub fn for_total_secs(total_secs: u64) -> Self {
        Self {
            total_secs,
            thresholds: [total_secs / 4, total_secs * 2 / 4, total_secs * 3 / 4],
        }
    }

    pub fn for_minutes(minutes: u32) -> Self {
        Self::for_total_secs(u64::from(minutes) * 60)
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn thresholds(&self) -> [u64; 3] {
        self.thresholds
    }

    /// Elapsed second at which `phase` should advance, or `None` for the last phase.
    pub fn threshold(&self, phase: usize) -> Option<u64> {
        self.thresholds.get(phase).copied()
    }

    pub fn phase(&self, index: usize) -> Option<&'static Phase> {
        PHASES.get(index)
    }
}
