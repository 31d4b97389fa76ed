//! Communication-graph rewiring.
//!
//! The graph of directed edges decides who can talk to whom. Daybreak
//! opens it up to every living agent; nightfall closes it down to the
//! mafia's private channel. Eliminated agents are absent from both
//! listings, so their severed edges are never touched again.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::model::{AgentId, Faction, GameId};
use crate::store::{AgentFilter, GameStore};

/// Open the day graph: an active edge for every ordered pair of living
/// agents. Returns how many edges were activated.
pub fn rewire_for_day(store: &dyn GameStore, game: GameId) -> Result<usize> {
    let living = store.list_agents(game, AgentFilter::Living)?;
    let mut activated = 0usize;
    for a in &living {
        for b in &living {
            if a.id != b.id {
                store.set_edge_active(game, a.id, b.id, true)?;
                activated += 1;
            }
        }
    }
    debug!(%game, activated, "day graph opened");
    Ok(activated)
}

/// Close the night graph: deactivate every active edge that is not
/// between two living mafiosi. Returns how many edges were severed.
pub fn rewire_for_night(store: &dyn GameStore, game: GameId) -> Result<usize> {
    let mafia: HashSet<AgentId> = store
        .list_agents(game, AgentFilter::LivingOf(Faction::Mafia))?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let mut severed = 0usize;
    for edge in store.list_edges(game)? {
        if edge.active && !(mafia.contains(&edge.from) && mafia.contains(&edge.to)) {
            store.set_edge_active(game, edge.from, edge.to, false)?;
            severed += 1;
        }
    }
    debug!(%game, severed, "night graph closed");
    Ok(severed)
}

/// Wire a newly joined mafioso into the faction's channel, both ways.
pub fn wire_mafia_join(store: &dyn GameStore, game: GameId, recruit: AgentId) -> Result<()> {
    for peer in store.list_agents(game, AgentFilter::LivingOf(Faction::Mafia))? {
        if peer.id == recruit {
            continue;
        }
        store.set_edge_active(game, peer.id, recruit, true)?;
        store.set_edge_active(game, recruit, peer.id, true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;
    use crate::store::MemoryStore;

    struct Harness {
        store: MemoryStore,
        game: GameId,
        mafia: Vec<AgentId>,
        bystanders: Vec<AgentId>,
    }

    fn harness(mafia: usize, bystanders: usize) -> Harness {
        let store = MemoryStore::new();
        let game = store.create_game(0).unwrap().id;
        let mut m = Vec::new();
        let mut b = Vec::new();
        for i in 0..mafia {
            let name = format!("M{i}");
            m.push(store.create_agent(game, Faction::Mafia, &name, 0).unwrap().id);
        }
        for i in 0..bystanders {
            let name = format!("B{i}");
            b.push(
                store
                    .create_agent(game, Faction::Bystander, &name, 0)
                    .unwrap()
                    .id,
            );
        }
        Harness {
            store,
            game,
            mafia: m,
            bystanders: b,
        }
    }

    fn active(store: &MemoryStore, game: GameId) -> Vec<Edge> {
        store
            .list_edges(game)
            .unwrap()
            .into_iter()
            .filter(|e| e.active)
            .collect()
    }

    #[test]
    fn day_graph_connects_every_ordered_living_pair() {
        let h = harness(1, 3);
        let activated = rewire_for_day(&h.store, h.game).unwrap();
        assert_eq!(activated, 4 * 3);
        assert_eq!(active(&h.store, h.game).len(), 12);
    }

    #[test]
    fn night_graph_keeps_only_mafia_pairs() {
        let h = harness(2, 3);
        rewire_for_day(&h.store, h.game).unwrap();
        let severed = rewire_for_night(&h.store, h.game).unwrap();

        let remaining = active(&h.store, h.game);
        assert_eq!(severed, 5 * 4 - 2);
        assert_eq!(remaining.len(), 2);
        for edge in remaining {
            assert!(h.mafia.contains(&edge.from));
            assert!(h.mafia.contains(&edge.to));
        }
    }

    #[test]
    fn lone_mafioso_reaches_nobody_at_night() {
        let h = harness(1, 3);
        rewire_for_day(&h.store, h.game).unwrap();
        rewire_for_night(&h.store, h.game).unwrap();
        assert!(active(&h.store, h.game).is_empty());
    }

    #[test]
    fn dead_agents_stay_out_of_the_day_graph() {
        let h = harness(1, 3);
        rewire_for_day(&h.store, h.game).unwrap();
        crate::cascade::eliminate(&h.store, h.game, h.bystanders[0], 1).unwrap();
        rewire_for_day(&h.store, h.game).unwrap();

        for edge in active(&h.store, h.game) {
            assert_ne!(edge.from, h.bystanders[0]);
            assert_ne!(edge.to, h.bystanders[0]);
        }
        assert_eq!(active(&h.store, h.game).len(), 3 * 2);
    }

    #[test]
    fn recruits_join_the_mafia_channel_both_ways() {
        let h = harness(2, 0);
        // harness created both up front; rewire as a join would
        wire_mafia_join(&h.store, h.game, h.mafia[1]).unwrap();

        let edges = active(&h.store, h.game);
        assert!(edges.contains(&Edge { from: h.mafia[0], to: h.mafia[1], active: true }));
        assert!(edges.contains(&Edge { from: h.mafia[1], to: h.mafia[0], active: true }));
    }
}
