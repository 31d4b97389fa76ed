//! Phase timing arithmetic.
//!
//! The schedule is pure state-free math: given the wall seconds elapsed
//! since a game started and the number of phase switches realized so far,
//! it answers which phase the game is in, how many seconds remain in it,
//! and whether the next boundary has been reached. Persistence and
//! exactly-once switching live elsewhere; two callers with the same inputs
//! always get the same answer here.

use thiserror::Error;

use crate::Phase;

/// Default day length in seconds.
pub const DEFAULT_DAY_SECS: i64 = 150;
/// Default night length in seconds.
pub const DEFAULT_NIGHT_SECS: i64 = 60;
/// Default break between phases in seconds.
pub const DEFAULT_BREAK_SECS: i64 = 10;
/// Default grace window before the first night in seconds.
pub const DEFAULT_LEAD_IN_SECS: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("{0} duration must be positive")]
    NonPositiveDuration(&'static str),
    #[error("{0} must not be negative")]
    NegativeWindow(&'static str),
    #[error("unknown phase name: {0}")]
    UnknownPhase(String),
}

/// Phase durations and grace windows for one game.
///
/// Each phase runs for its full duration, followed by a short break before
/// the next phase starts counting. The lead-in plays the same role before
/// the very first night. Breaks and the lead-in are surfaced as the tail
/// of the upcoming phase's countdown rather than as separate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseSchedule {
    day_secs: i64,
    night_secs: i64,
    break_secs: i64,
    lead_in_secs: i64,
}

/// What a schedule reports for one instant: the current phase and the
/// seconds left in it. `remaining` is always in `(0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub phase: Phase,
    pub remaining: i64,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            day_secs: DEFAULT_DAY_SECS,
            night_secs: DEFAULT_NIGHT_SECS,
            break_secs: DEFAULT_BREAK_SECS,
            lead_in_secs: DEFAULT_LEAD_IN_SECS,
        }
    }
}

impl PhaseSchedule {
    /// Build a schedule, rejecting degenerate durations.
    pub fn new(
        day_secs: i64,
        night_secs: i64,
        break_secs: i64,
        lead_in_secs: i64,
    ) -> Result<Self, ClockError> {
        if day_secs <= 0 {
            return Err(ClockError::NonPositiveDuration("day"));
        }
        if night_secs <= 0 {
            return Err(ClockError::NonPositiveDuration("night"));
        }
        if break_secs < 0 {
            return Err(ClockError::NegativeWindow("break"));
        }
        if lead_in_secs < 0 {
            return Err(ClockError::NegativeWindow("lead-in"));
        }
        Ok(Self {
            day_secs,
            night_secs,
            break_secs,
            lead_in_secs,
        })
    }

    pub const fn day_secs(&self) -> i64 {
        self.day_secs
    }

    pub const fn night_secs(&self) -> i64 {
        self.night_secs
    }

    pub const fn break_secs(&self) -> i64 {
        self.break_secs
    }

    pub const fn lead_in_secs(&self) -> i64 {
        self.lead_in_secs
    }

    /// Length of the given phase in seconds.
    pub const fn duration_of(&self, phase: Phase) -> i64 {
        match phase {
            Phase::Day => self.day_secs,
            Phase::Night => self.night_secs,
        }
    }

    /// Wall seconds consumed by every phase (and trailing break) realized
    /// before the phase implied by `switches` began. Games alternate
    /// night, day, night, ... so `switches` splits into ceil/2 nights and
    /// floor/2 days.
    const fn consumed_before(&self, switches: u64) -> i64 {
        let s = switches as i64;
        let nights = (s + 1) / 2;
        let days = s / 2;
        nights * (self.night_secs + self.break_secs) + days * (self.day_secs + self.break_secs)
    }

    /// Signed seconds spent inside the current phase. Negative values mean
    /// the game is still in the break (or lead-in) ahead of that phase.
    pub const fn elapsed_in_phase(&self, elapsed_secs: i64, switches: u64) -> i64 {
        elapsed_secs - self.lead_in_secs - self.consumed_before(switches)
    }

    /// Whether the phase implied by `switches` has run out, i.e. whether a
    /// phase switch is due. Stays `false` throughout break windows.
    pub const fn boundary_crossed(&self, elapsed_secs: i64, switches: u64) -> bool {
        let phase = Phase::for_switches(switches);
        self.elapsed_in_phase(elapsed_secs, switches) >= self.duration_of(phase)
    }

    /// The countdown to report for this instant.
    ///
    /// Inside a phase the remaining seconds fall from the full duration to
    /// one. During the break (or lead-in) before a phase, the countdown
    /// shows the break tail, so clients see e.g. 10, 9, ... 1 and then the
    /// full duration again once the phase proper starts. The floored
    /// remainder keeps both cases on one formula.
    pub const fn countdown(&self, elapsed_secs: i64, switches: u64) -> Countdown {
        let phase = Phase::for_switches(switches);
        let duration = self.duration_of(phase);
        let in_phase = self.elapsed_in_phase(elapsed_secs, switches);
        Countdown {
            phase,
            remaining: duration - in_phase.rem_euclid(duration),
        }
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn remaining_stays_within_phase_duration(
            elapsed in -100i64..1_000_000,
            switches in 0u64..1000,
        ) {
            let s = PhaseSchedule::default();
            let c = s.countdown(elapsed, switches);
            prop_assert!(c.remaining >= 1);
            prop_assert!(c.remaining <= s.duration_of(c.phase));
        }

        #[test]
        fn boundary_never_uncrosses(elapsed in 0i64..1_000_000, switches in 0u64..1000) {
            let s = PhaseSchedule::default();
            if s.boundary_crossed(elapsed, switches) {
                prop_assert!(s.boundary_crossed(elapsed + 1, switches));
            }
        }

        #[test]
        fn countdown_ticks_down_one_wall_second(
            elapsed in -100i64..1_000_000,
            switches in 0u64..1000,
        ) {
            let s = PhaseSchedule::default();
            let now = s.countdown(elapsed, switches);
            let next = s.countdown(elapsed + 1, switches);
            let expected = if now.remaining == 1 {
                s.duration_of(now.phase)
            } else {
                now.remaining - 1
            };
            prop_assert_eq!(next.remaining, expected);
        }

        #[test]
        fn a_cycle_pair_consumes_constant_wall_time(switches in 0u64..1000) {
            let s = PhaseSchedule::default();
            let pair = s.day_secs() + s.night_secs() + 2 * s.break_secs();
            prop_assert_eq!(
                s.consumed_before(switches + 2) - s.consumed_before(switches),
                pair
            );
        }
    }
}
