//! Win-condition evaluation.

use crate::model::Faction;

/// Decide whether the game is over, given post-elimination head counts.
///
/// The mafia parity check runs first: once the living mafia match or
/// outnumber the living bystanders they control every vote, so the game
/// is theirs. Bystanders win only by eliminating every mafioso. Anything
/// else keeps the game running.
pub const fn evaluate(living_mafia: usize, living_bystanders: usize) -> Option<Faction> {
    if living_mafia >= living_bystanders {
        Some(Faction::Mafia)
    } else if living_mafia == 0 {
        Some(Faction::Bystander)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_hands_the_game_to_the_mafia() {
        assert_eq!(evaluate(1, 1), Some(Faction::Mafia));
        assert_eq!(evaluate(2, 2), Some(Faction::Mafia));
        assert_eq!(evaluate(3, 2), Some(Faction::Mafia));
    }

    #[test]
    fn extinct_mafia_hands_the_game_to_the_bystanders() {
        assert_eq!(evaluate(0, 1), Some(Faction::Bystander));
        assert_eq!(evaluate(0, 7), Some(Faction::Bystander));
    }

    #[test]
    fn outnumbered_mafia_keeps_the_game_running() {
        assert_eq!(evaluate(1, 2), None);
        assert_eq!(evaluate(1, 3), None);
        assert_eq!(evaluate(2, 5), None);
    }

    #[test]
    fn empty_roster_falls_to_the_parity_rule() {
        assert_eq!(evaluate(0, 0), Some(Faction::Mafia));
    }
}
