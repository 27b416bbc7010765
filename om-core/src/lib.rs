//! Domain model for Om meditation sessions.
//!
//! # Core Concepts
//!
//! ## Setup
//!
//! - [`Persona`]: A guiding voice and style. The self-guided persona has no voice.
//! - [`Intent`]: The purpose of a session, each with a default mantra.
//! - [`SessionDraft`]: The three setup steps (guide, intent, duration) that produce
//!   an immutable [`SessionConfig`].
//!
//! ## Running a Session
//!
//! - [`PhaseController`]: Owns session timing and moves through the four [`PHASES`].
//! - [`SessionClock`] and [`PhaseSchedule`]: Derived from the config on start.
//! - [`Transcript`]: Ordered user/assistant turns, cleared on every start.
//!
//! This crate performs no I/O. Callers pass the current time in and act on the
//! outcomes the controller reports.

mod clock;
mod config;
mod controller;
mod draft;
mod error;
pub mod guidance;
mod intent;
mod persona;
mod schedule;
mod transcript;

pub use clock::*;
pub use config::*;
pub use controller::*;
pub use draft::*;
pub use error::*;
pub use intent::*;
pub use persona::*;
pub use schedule::*;
pub use transcript::*;
