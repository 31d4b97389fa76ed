//! At-most-once realization of phase boundaries.
//!
//! Any number of pollers can observe the same due boundary at once. The
//! guard arbitrates: exactly one caller wins the store's advisory
//! transition slot and runs the pipeline; everyone else learns that the
//! switch was already realized (or is being realized) and reports the
//! persisted outcome instead. The broadcast ledger's length is the
//! authority for what has been realized; the slot only serializes the
//! execution window between the due-check and the commit.

use tracing::debug;

use crate::error::Result;
use crate::model::GameId;
use crate::store::{GameStore, TransitionCommit};

/// What a caller should do about a boundary it observed.
#[derive(Debug)]
pub enum Arbitration<'a> {
    /// This caller runs the pipeline. Commit or drop the slot.
    Execute(TransitionSlot<'a>),
    /// The boundary was realized by someone else; re-read and report.
    Replayed,
    /// Another caller is realizing it right now.
    Busy,
}

/// Holder of a game's advisory transition slot.
///
/// Dropping the slot without committing aborts, so a pipeline that errors
/// or panics never leaves the game wedged.
pub struct TransitionSlot<'a> {
    store: &'a dyn GameStore,
    game: GameId,
    armed: bool,
}

impl std::fmt::Debug for TransitionSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionSlot")
            .field("game", &self.game)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl TransitionSlot<'_> {
    /// Atomically persist the transition and release the slot.
    pub fn commit(mut self, commit: &TransitionCommit) -> Result<()> {
        self.armed = false;
        self.store.commit_transition(self.game, commit)
    }
}

impl Drop for TransitionSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.store.abort_transition(self.game) {
                debug!(game = %self.game, %err, "abort after failed transition also failed");
            }
        }
    }
}

/// Arbitration over one game's transitions.
pub struct ReplayGuard<'a> {
    store: &'a dyn GameStore,
    game: GameId,
}

impl<'a> ReplayGuard<'a> {
    pub fn new(store: &'a dyn GameStore, game: GameId) -> Self {
        Self { store, game }
    }

    /// Decide this caller's role for the boundary after `observed_switches`
    /// realized switches.
    ///
    /// The ledger is consulted twice: once before taking the slot, and
    /// again under it, because another caller may commit between the two
    /// reads. Only a caller that still sees its observed count after
    /// winning the slot may execute.
    pub fn arbitrate(&self, observed_switches: u64) -> Result<Arbitration<'a>> {
        if self.store.broadcast_count(self.game)? > observed_switches {
            return Ok(Arbitration::Replayed);
        }
        if !self.store.begin_transition(self.game)? {
            return Ok(Arbitration::Busy);
        }
        let under_slot = match self.store.broadcast_count(self.game) {
            Ok(count) => count,
            Err(err) => {
                let _ = self.store.abort_transition(self.game);
                return Err(err);
            }
        };
        if under_slot > observed_switches {
            self.store.abort_transition(self.game)?;
            return Ok(Arbitration::Replayed);
        }
        Ok(Arbitration::Execute(TransitionSlot {
            store: self.store,
            game: self.game,
            armed: true,
        }))
    }
}
