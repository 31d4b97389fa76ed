//! Elimination side effects.
//!
//! Eliminating an agent touches four kinds of state: the agent record,
//! every edge the agent sits on, the messages they sent, and the
//! deliveries still owed to them. The cascade applies all of it through
//! the store. Exactly-once execution is the replay guard's concern; if a
//! replayed transition ever reaches this code the store refuses the
//! second `mark_eliminated` and the error surfaces as an invariant
//! violation upstream.

use tracing::info;

use crate::error::Result;
use crate::model::{AgentId, GameId};
use crate::store::GameStore;

/// Apply every elimination side effect for `victim`.
///
/// `rank` is the victim's 1-based elimination order.
pub fn eliminate(store: &dyn GameStore, game: GameId, victim: AgentId, rank: u32) -> Result<()> {
    store.mark_eliminated(victim, rank)?;

    let mut severed = 0usize;
    for edge in store.list_edges(game)? {
        if edge.active && (edge.from == victim || edge.to == victim) {
            store.set_edge_active(game, edge.from, edge.to, false)?;
            severed += 1;
        }
    }

    store.void_agent_messages(game, victim)?;

    info!(%game, %victim, rank, severed, "agent eliminated");
    Ok(())
}
