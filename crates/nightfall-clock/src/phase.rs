//! The two alternating game phases.

use std::fmt;

/// One of the two game phases.
///
/// A game opens at night. Every realized phase switch flips the phase, so
/// the phase is fully determined by the number of switches realized so far:
/// even counts mean night, odd counts mean day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Phase {
    Day,
    Night,
}

impl Phase {
    /// The phase implied by a realized switch count.
    pub const fn for_switches(switches: u64) -> Self {
        if switches % 2 == 0 {
            Phase::Night
        } else {
            Phase::Day
        }
    }

    /// The phase that follows this one.
    pub const fn flipped(self) -> Self {
        match self {
            Phase::Day => Phase::Night,
            Phase::Night => Phase::Day,
        }
    }

    pub const fn is_day(self) -> bool {
        matches!(self, Phase::Day)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Day => "day",
            Phase::Night => "night",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Phase::Day),
            "night" => Ok(Phase::Night),
            other => Err(crate::ClockError::UnknownPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn games_open_at_night() {
        assert_eq!(Phase::for_switches(0), Phase::Night);
    }

    #[test]
    fn switch_parity_alternates_phases() {
        assert_eq!(Phase::for_switches(1), Phase::Day);
        assert_eq!(Phase::for_switches(2), Phase::Night);
        assert_eq!(Phase::for_switches(3), Phase::Day);
        assert_eq!(Phase::for_switches(101), Phase::Day);
    }

    #[test]
    fn flipped_is_involutive() {
        assert_eq!(Phase::Day.flipped(), Phase::Night);
        assert_eq!(Phase::Night.flipped().flipped(), Phase::Night);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("day".parse::<Phase>().unwrap(), Phase::Day);
        assert_eq!("night".parse::<Phase>().unwrap(), Phase::Night);
        assert!("dusk".parse::<Phase>().is_err());
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(Phase::Day.to_string(), "day");
        assert_eq!(Phase::Night.to_string(), "night");
    }
}
