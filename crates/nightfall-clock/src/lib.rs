//! Nightfall Clock - Phase Timing
//!
//! The stateless countdown behind every Nightfall game. Given two inputs,
//! the wall seconds elapsed since the game started and the number of phase
//! switches realized so far, the clock derives the current phase and the
//! seconds remaining in it. No timers run anywhere; any number of
//! redundant pollers can evaluate the clock concurrently and agree.
//!
//! # Core Types
//!
//! - [`Phase`] - Day or night, determined by switch-count parity
//! - [`PhaseSchedule`] - Durations, break windows, and the countdown math
//! - [`Countdown`] - The answer for one instant: phase plus seconds left
//!
//! # Example
//!
//! ```
//! use nightfall_clock::{Phase, PhaseSchedule};
//!
//! let schedule = PhaseSchedule::default();
//! let c = schedule.countdown(30, 0);
//! assert_eq!(c.phase, Phase::Night);
//! assert_eq!(c.remaining, 32);
//! assert!(!schedule.boundary_crossed(30, 0));
//! ```

mod phase;
mod schedule;

pub use phase::Phase;
pub use schedule::{
    ClockError, Countdown, PhaseSchedule, DEFAULT_BREAK_SECS, DEFAULT_DAY_SECS,
    DEFAULT_LEAD_IN_SECS, DEFAULT_NIGHT_SECS,
};
