use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Phase, PhaseSchedule, SessionClock, SessionConfig, LAST_PHASE, PHASES};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Running(usize),
    Finished,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running(_) => "running",
            Self::Finished => "finished",
        }
    }
}

/// A phase the controller has just entered. The owner is expected to emit
/// exactly one guidance entry for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEntry {
    pub index: usize,
    pub phase: &'static Phase,
}

impl PhaseEntry {
    fn new(index: usize) -> Self {
        Self {
            index,
            phase: &PHASES[index],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session has been started.
    Idle,
    /// Running, no threshold crossed on this tick.
    Waiting { elapsed: u64 },
    /// Crossed the current phase's threshold and moved one phase forward.
    Advanced { entry: PhaseEntry, elapsed: u64 },
    /// Reached the end of the session on this tick.
    Finished { total: u64 },
    /// Already finished before this tick.
    AlreadyFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced(PhaseEntry),
    /// Already on the closing phase; nothing changed.
    NoFurtherPhases,
    /// Not started yet, or already finished; nothing changed.
    NotRunning,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    config: SessionConfig,
    clock: SessionClock,
    schedule: PhaseSchedule,
}

/// State machine that owns session timing and phase progression.
///
/// `Idle -> Running(0) -> .. -> Running(3) -> Finished`. Phases advance on
/// [`tick`](Self::tick) when elapsed time crosses the current phase's
/// threshold, or on an explicit [`advance`](Self::advance). A tick moves at
/// most one phase, so a late tick never skips guidance.
#[derive(Debug, Clone)]
pub struct PhaseController {
    state: ControllerState,
    active: Option<ActiveSession>,
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            active: None,
        }
    }

    /// Begin a session from any state, discarding whatever came before.
    pub fn start(&mut self, config: SessionConfig, now: DateTime<Utc>) -> PhaseEntry {
        let total = config.total_secs();
        self.active = Some(ActiveSession {
            clock: SessionClock::start(now, total),
            schedule: PhaseSchedule::for_total_secs(total),
            config,
        });
        self.state = ControllerState::Running(0);
        PhaseEntry::new(0)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let phase = match self.state {
            ControllerState::Idle => return TickOutcome::Idle,
            ControllerState::Finished => return TickOutcome::AlreadyFinished,
            ControllerState::Running(phase) => phase,
        };
        let Some(active) = &self.active else {
            return TickOutcome::Idle;
        };

        if active.clock.is_over(now) {
            let total = active.clock.total_secs();
            self.state = ControllerState::Finished;
            return TickOutcome::Finished { total };
        }

        let elapsed = active.clock.elapsed_secs(now);
        match active.schedule.threshold(phase) {
            Some(threshold) if elapsed >= threshold => {
                let entry = PhaseEntry::new(phase + 1);
                self.state = ControllerState::Running(entry.index);
                TickOutcome::Advanced { entry, elapsed }
            }
            _ => TickOutcome::Waiting { elapsed },
        }
    }

    /// Move to the next phase on request.
    pub fn advance(&mut self) -> AdvanceOutcome {
        match self.state {
            ControllerState::Running(phase) if phase < LAST_PHASE => {
                let entry = PhaseEntry::new(phase + 1);
                self.state = ControllerState::Running(entry.index);
                AdvanceOutcome::Advanced(entry)
            }
            ControllerState::Running(_) => AdvanceOutcome::NoFurtherPhases,
            ControllerState::Idle | ControllerState::Finished => AdvanceOutcome::NotRunning,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn phase_index(&self) -> Option<usize> {
        match self.state {
            ControllerState::Running(phase) => Some(phase),
            _ => None,
        }
    }

    pub fn current_phase(&self) -> Option<&'static Phase> {
        self.phase_index().map(|i| &PHASES[i])
    }

    pub fn is_finished(&self) -> bool {
        self.state == ControllerState::Finished
    }

    /// Whether a manual advance would change anything.
    pub fn can_advance(&self) -> bool {
        matches!(self.state, ControllerState::Running(phase) if phase < LAST_PHASE)
    }

    /// Config of the current or most recent session.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    pub fn clock(&self) -> Option<&SessionClock> {
        self.active.as_ref().map(|a| &a.clock)
    }

    pub fn schedule(&self) -> Option<&PhaseSchedule> {
        self.active.as_ref().map(|a| &a.schedule)
    }
}
