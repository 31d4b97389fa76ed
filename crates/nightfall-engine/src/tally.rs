//! Vote tallying and tie resolution.
//!
//! A tally looks at the votes cast during the closing phase and names at
//! most one victim. Revotes supersede; only a voter's latest vote counts.
//! Ties are broken with draws from the process's randomness stream, one
//! draw per tied candidate, and the number of draws consumed is reported
//! so it can be persisted alongside the transition.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::draws::DrawStream;
use crate::model::{AgentId, Vote};

/// Result of one tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyOutcome {
    pub victim: Option<AgentId>,
    /// Tie-break draws consumed resolving this tally.
    pub draws_consumed: u32,
}

impl TallyOutcome {
    const NOBODY: TallyOutcome = TallyOutcome {
        victim: None,
        draws_consumed: 0,
    };
}

/// Resolve the phase's votes into a victim.
///
/// `votes` are the phase's votes in cast order. Votes from agents outside
/// `eligible_voters` are ignored, as is any latest vote whose target is
/// not in `living_targets`. With no valid votes nobody is eliminated.
///
/// Ties take one draw per tied candidate, visited in ascending agent id,
/// and the candidate with the highest draw wins. A lone leader still
/// consumes one draw, which keeps the stream advance a pure function of
/// the candidate count.
pub fn resolve(
    votes: &[Vote],
    eligible_voters: &[AgentId],
    living_targets: &[AgentId],
    draws: &mut dyn DrawStream,
) -> TallyOutcome {
    let eligible: HashSet<AgentId> = eligible_voters.iter().copied().collect();
    let living: HashSet<AgentId> = living_targets.iter().copied().collect();

    let mut latest: HashMap<AgentId, Vote> = HashMap::new();
    for vote in votes {
        if !eligible.contains(&vote.voter) {
            continue;
        }
        match latest.get(&vote.voter) {
            // equal timestamps resolve to the later record in cast order
            Some(prev) if prev.cast_at > vote.cast_at => {}
            _ => {
                latest.insert(vote.voter, *vote);
            }
        }
    }

    let mut counts: BTreeMap<AgentId, u32> = BTreeMap::new();
    for vote in latest.values() {
        if living.contains(&vote.target) {
            *counts.entry(vote.target).or_insert(0) += 1;
        }
    }

    let Some(&top) = counts.values().max() else {
        return TallyOutcome::NOBODY;
    };

    let mut victim = None;
    let mut best_draw = f64::NEG_INFINITY;
    let mut draws_consumed = 0u32;
    for (&candidate, &count) in &counts {
        if count != top {
            continue;
        }
        let draw = draws.next_draw();
        draws_consumed += 1;
        if draw > best_draw {
            best_draw = draw;
            victim = Some(candidate);
        }
    }

    TallyOutcome {
        victim,
        draws_consumed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draws::RecordingDraws;

    fn vote(voter: u64, target: u64, cast_at: i64) -> Vote {
        Vote {
            voter: AgentId(voter),
            target: AgentId(target),
            cast_at,
        }
    }

    fn ids(raw: &[u64]) -> Vec<AgentId> {
        raw.iter().copied().map(AgentId).collect()
    }

    #[test]
    fn majority_wins_with_one_draw() {
        let votes = [vote(1, 4, 10), vote(2, 4, 11), vote(3, 5, 12)];
        let mut draws = RecordingDraws::with(vec![0.5]);
        let outcome = resolve(&votes, &ids(&[1, 2, 3]), &ids(&[1, 2, 3, 4, 5]), &mut draws);
        assert_eq!(outcome.victim, Some(AgentId(4)));
        assert_eq!(outcome.draws_consumed, 1);
        assert_eq!(draws.taken(), 1);
    }

    #[test]
    fn no_valid_votes_means_no_victim_and_no_draws() {
        let mut draws = RecordingDraws::with(vec![]);
        let outcome = resolve(&[], &ids(&[1, 2]), &ids(&[1, 2]), &mut draws);
        assert_eq!(outcome, TallyOutcome { victim: None, draws_consumed: 0 });
        assert_eq!(draws.taken(), 0);
    }

    #[test]
    fn only_the_latest_vote_per_voter_counts() {
        let votes = [vote(1, 4, 10), vote(1, 5, 20), vote(2, 5, 15)];
        let mut draws = RecordingDraws::with(vec![0.5]);
        let outcome = resolve(&votes, &ids(&[1, 2]), &ids(&[4, 5]), &mut draws);
        // voter 1 revoted for 5, so 5 has two votes and 4 none
        assert_eq!(outcome.victim, Some(AgentId(5)));
        assert_eq!(outcome.draws_consumed, 1);
    }

    #[test]
    fn superseded_votes_cannot_resurrect_an_invalid_latest() {
        // voter 1's latest vote targets a dead agent, so voter 1
        // contributes nothing even though their first vote was valid
        let votes = [vote(1, 4, 10), vote(1, 9, 20), vote(2, 5, 15)];
        let mut draws = RecordingDraws::with(vec![0.5]);
        let outcome = resolve(&votes, &ids(&[1, 2]), &ids(&[4, 5]), &mut draws);
        assert_eq!(outcome.victim, Some(AgentId(5)));
    }

    #[test]
    fn ineligible_voters_are_ignored() {
        let votes = [vote(1, 4, 10), vote(7, 5, 11), vote(8, 5, 12)];
        let mut draws = RecordingDraws::with(vec![0.5]);
        let outcome = resolve(&votes, &ids(&[1]), &ids(&[4, 5]), &mut draws);
        assert_eq!(outcome.victim, Some(AgentId(4)));
    }

    #[test]
    fn dead_targets_are_dropped_silently() {
        let votes = [vote(1, 9, 10), vote(2, 9, 11)];
        let mut draws = RecordingDraws::with(vec![]);
        let outcome = resolve(&votes, &ids(&[1, 2]), &ids(&[1, 2]), &mut draws);
        assert_eq!(outcome.victim, None);
        assert_eq!(outcome.draws_consumed, 0);
    }

    #[test]
    fn two_way_tie_consumes_two_draws_and_follows_the_stream() {
        let votes = [vote(1, 4, 10), vote(2, 5, 11), vote(3, 4, 12), vote(6, 5, 13)];
        let voters = ids(&[1, 2, 3, 6]);
        let living = ids(&[1, 2, 3, 4, 5, 6]);

        // candidate 4 draws first (lower id), candidate 5 second
        let mut low_then_high = RecordingDraws::with(vec![0.2, 0.9]);
        let outcome = resolve(&votes, &voters, &living, &mut low_then_high);
        assert_eq!(outcome.victim, Some(AgentId(5)));
        assert_eq!(outcome.draws_consumed, 2);

        let mut high_then_low = RecordingDraws::with(vec![0.9, 0.2]);
        let outcome = resolve(&votes, &voters, &living, &mut high_then_low);
        assert_eq!(outcome.victim, Some(AgentId(4)));
        assert_eq!(outcome.draws_consumed, 2);
    }

    #[test]
    fn tie_break_never_picks_a_trailing_candidate() {
        let votes = [
            vote(1, 4, 10),
            vote(2, 4, 11),
            vote(3, 5, 12),
            vote(6, 5, 13),
            vote(7, 8, 14),
        ];
        let voters = ids(&[1, 2, 3, 6, 7]);
        let living = ids(&[1, 2, 3, 4, 5, 6, 7, 8]);
        for script in [vec![0.1, 0.2], vec![0.2, 0.1], vec![0.99, 0.98]] {
            let mut draws = RecordingDraws::with(script);
            let outcome = resolve(&votes, &voters, &living, &mut draws);
            assert_ne!(outcome.victim, Some(AgentId(8)));
            assert_eq!(outcome.draws_consumed, 2);
        }
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use crate::draws::SeededDraws;
    use proptest::prelude::*;

    fn votes_strategy() -> impl Strategy<Value = Vec<Vote>> {
        proptest::collection::vec(
            (0u64..8, 0u64..8, 0i64..100).prop_map(|(voter, target, cast_at)| Vote {
                voter: AgentId(voter),
                target: AgentId(target),
                cast_at,
            }),
            0..32,
        )
    }

    proptest! {
        #[test]
        fn victim_is_always_a_living_target(
            votes in votes_strategy(),
            eligible in proptest::collection::hash_set(0u64..8, 0..8),
            living in proptest::collection::hash_set(0u64..8, 0..8),
        ) {
            let eligible: Vec<AgentId> = eligible.into_iter().map(AgentId).collect();
            let living: Vec<AgentId> = living.into_iter().map(AgentId).collect();
            let mut draws = SeededDraws::new(7);
            let outcome = resolve(&votes, &eligible, &living, &mut draws);
            if let Some(victim) = outcome.victim {
                prop_assert!(living.contains(&victim));
            }
        }

        #[test]
        fn stream_advances_by_exactly_the_reported_draws(votes in votes_strategy()) {
            let everyone: Vec<AgentId> = (0..8).map(AgentId).collect();
            let mut draws = SeededDraws::new(11);
            let outcome = resolve(&votes, &everyone, &everyone, &mut draws);
            prop_assert_eq!(draws.taken(), u64::from(outcome.draws_consumed));
            prop_assert_eq!(outcome.victim.is_some(), outcome.draws_consumed > 0);
        }

        #[test]
        fn draw_cost_is_independent_of_the_stream(votes in votes_strategy()) {
            // two processes with different streams may disagree on who a
            // tie falls to, never on how many draws resolving it costs
            let everyone: Vec<AgentId> = (0..8).map(AgentId).collect();
            let mut a = SeededDraws::new(1);
            let mut b = SeededDraws::new(2);
            let left = resolve(&votes, &everyone, &everyone, &mut a);
            let right = resolve(&votes, &everyone, &everyone, &mut b);
            prop_assert_eq!(left.draws_consumed, right.draws_consumed);
            prop_assert_eq!(left.victim.is_some(), right.victim.is_some());
        }
    }
}
