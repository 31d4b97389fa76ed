//! Persistence seam.
//!
//! [`GameStore`] is the narrow interface the engine reads and writes game
//! state through. Implementations must make each call atomic and
//! read-after-write consistent; the engine layers its exactly-once
//! transition protocol on top of the advisory slot calls. [`MemoryStore`]
//! is the in-process implementation used by the server and the tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use nightfall_clock::Phase;

use crate::error::{Error, Result};
use crate::model::{
    Agent, AgentId, Broadcast, Delivery, DeliveryState, Edge, Faction, Game, GameId, InboxItem,
    Message, MessageId, UnixMillis, Vote,
};

/// Which agents a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFilter {
    All,
    Living,
    LivingOf(Faction),
}

impl AgentFilter {
    fn admits(self, agent: &Agent) -> bool {
        match self {
            AgentFilter::All => true,
            AgentFilter::Living => agent.alive,
            AgentFilter::LivingOf(faction) => agent.is_living(faction),
        }
    }
}

/// Everything one realized phase switch persists, applied as a unit:
/// the game's new top-level fields plus the appended broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionCommit {
    pub phase: Phase,
    pub victim: Option<AgentId>,
    pub winner: Option<Faction>,
    pub elimination_count: u32,
    pub tie_break_draws: u32,
    pub at: UnixMillis,
}

/// Store interface for game state.
///
/// The advisory transition slot (`begin_transition` / `commit_transition` /
/// `abort_transition`) is per game: at most one caller holds it at a time,
/// and only the holder may commit. A commit atomically appends the
/// broadcast, rewrites the game record, and releases the slot, so the
/// broadcast count other callers read moves only at commit instants.
pub trait GameStore: Send + Sync {
    fn create_game(&self, now: UnixMillis) -> Result<Game>;
    fn load_game(&self, game: GameId) -> Result<Game>;
    /// Rewrite a game record outside the transition protocol. Used for
    /// lobby changes such as stamping `started_at`.
    fn persist_game(&self, game: &Game) -> Result<()>;

    /// Insert an agent. Display names are unique per game.
    fn create_agent(
        &self,
        game: GameId,
        faction: Faction,
        display_name: &str,
        now: UnixMillis,
    ) -> Result<Agent>;
    fn get_agent(&self, agent: AgentId) -> Result<Agent>;
    fn find_agent_by_name(&self, game: GameId, display_name: &str) -> Result<Option<Agent>>;
    /// Agents of a game in join order.
    fn list_agents(&self, game: GameId, filter: AgentFilter) -> Result<Vec<Agent>>;
    /// Flip an agent to eliminated with the given 1-based rank. Fails with
    /// [`Error::Invariant`] if the agent is already eliminated.
    fn mark_eliminated(&self, agent: AgentId, rank: u32) -> Result<()>;

    fn record_vote(&self, game: GameId, vote: Vote) -> Result<()>;
    /// Votes cast strictly after `since`, in cast order.
    fn votes_since(&self, game: GameId, since: UnixMillis) -> Result<Vec<Vote>>;

    fn list_edges(&self, game: GameId) -> Result<Vec<Edge>>;
    fn set_edge_active(&self, game: GameId, from: AgentId, to: AgentId, active: bool)
        -> Result<()>;

    /// Insert a message and one pending delivery per recipient.
    fn create_message(
        &self,
        game: GameId,
        from: AgentId,
        body: &str,
        recipients: &[AgentId],
        now: UnixMillis,
    ) -> Result<MessageId>;
    /// Hand over and mark delivered everything pending for `to`, oldest
    /// first. Void messages are skipped permanently.
    fn drain_inbox(&self, game: GameId, to: AgentId) -> Result<Vec<InboxItem>>;
    /// Void everything an eliminated agent sent and everything still
    /// pending for them.
    fn void_agent_messages(&self, game: GameId, agent: AgentId) -> Result<()>;

    /// Length of the broadcast ledger: the authoritative switch count.
    fn broadcast_count(&self, game: GameId) -> Result<u64>;
    /// The `index`-th broadcast (0-based), if realized yet.
    fn broadcast_at(&self, game: GameId, index: u64) -> Result<Option<Broadcast>>;
    fn latest_broadcast(&self, game: GameId) -> Result<Option<Broadcast>>;

    /// Try to take the game's transition slot. `Ok(false)` means someone
    /// else holds it right now.
    fn begin_transition(&self, game: GameId) -> Result<bool>;
    /// Apply a transition and release the slot. Only the slot holder may
    /// call this.
    fn commit_transition(&self, game: GameId, commit: &TransitionCommit) -> Result<()>;
    /// Release the slot without committing.
    fn abort_transition(&self, game: GameId) -> Result<()>;
}

#[derive(Default)]
struct Tables {
    games: HashMap<GameId, Game>,
    agents: BTreeMap<AgentId, Agent>,
    votes: HashMap<GameId, Vec<Vote>>,
    edges: HashMap<GameId, BTreeMap<(AgentId, AgentId), bool>>,
    messages: HashMap<GameId, BTreeMap<MessageId, Message>>,
    deliveries: HashMap<GameId, Vec<Delivery>>,
    broadcasts: HashMap<GameId, Vec<Broadcast>>,
    next_game: u64,
    next_agent: u64,
    next_message: u64,
}

/// In-memory [`GameStore`].
///
/// One `RwLock` guards the record tables. The transition slots live in a
/// separate mutex so begin/abort never contend with plain reads, while
/// commits take the table lock and therefore publish the new broadcast
/// count and game record at one instant.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
    slots: Mutex<HashSet<GameId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashSet<GameId>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unknown_game(game: GameId) -> Error {
    Error::NotFound(format!("game {game}"))
}

impl GameStore for MemoryStore {
    fn create_game(&self, now: UnixMillis) -> Result<Game> {
        let mut tables = self.write();
        tables.next_game += 1;
        let game = Game::new(GameId(tables.next_game), now);
        tables.games.insert(game.id, game.clone());
        Ok(game)
    }

    fn load_game(&self, game: GameId) -> Result<Game> {
        self.read()
            .games
            .get(&game)
            .cloned()
            .ok_or_else(|| unknown_game(game))
    }

    fn persist_game(&self, game: &Game) -> Result<()> {
        let mut tables = self.write();
        match tables.games.get_mut(&game.id) {
            Some(slot) => {
                *slot = game.clone();
                Ok(())
            }
            None => Err(unknown_game(game.id)),
        }
    }

    fn create_agent(
        &self,
        game: GameId,
        faction: Faction,
        display_name: &str,
        now: UnixMillis,
    ) -> Result<Agent> {
        let mut tables = self.write();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        let taken = tables
            .agents
            .values()
            .any(|a| a.game == game && a.display_name == display_name);
        if taken {
            return Err(Error::InvalidInput(format!(
                "display name already taken: {display_name}"
            )));
        }
        tables.next_agent += 1;
        let agent = Agent {
            id: AgentId(tables.next_agent),
            game,
            faction,
            display_name: display_name.to_string(),
            alive: true,
            elimination_rank: None,
            joined_at: now,
        };
        tables.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    fn get_agent(&self, agent: AgentId) -> Result<Agent> {
        self.read()
            .agents
            .get(&agent)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("agent {agent}")))
    }

    fn find_agent_by_name(&self, game: GameId, display_name: &str) -> Result<Option<Agent>> {
        Ok(self
            .read()
            .agents
            .values()
            .find(|a| a.game == game && a.display_name == display_name)
            .cloned())
    }

    fn list_agents(&self, game: GameId, filter: AgentFilter) -> Result<Vec<Agent>> {
        let tables = self.read();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        Ok(tables
            .agents
            .values()
            .filter(|a| a.game == game && filter.admits(a))
            .cloned()
            .collect())
    }

    fn mark_eliminated(&self, agent: AgentId, rank: u32) -> Result<()> {
        let mut tables = self.write();
        let record = tables
            .agents
            .get_mut(&agent)
            .ok_or_else(|| Error::NotFound(format!("agent {agent}")))?;
        if !record.alive {
            return Err(Error::Invariant(format!(
                "agent {agent} is already eliminated"
            )));
        }
        record.alive = false;
        record.elimination_rank = Some(rank);
        Ok(())
    }

    fn record_vote(&self, game: GameId, vote: Vote) -> Result<()> {
        let mut tables = self.write();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        tables.votes.entry(game).or_default().push(vote);
        Ok(())
    }

    fn votes_since(&self, game: GameId, since: UnixMillis) -> Result<Vec<Vote>> {
        Ok(self
            .read()
            .votes
            .get(&game)
            .map(|votes| {
                votes
                    .iter()
                    .filter(|v| v.cast_at > since)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_edges(&self, game: GameId) -> Result<Vec<Edge>> {
        Ok(self
            .read()
            .edges
            .get(&game)
            .map(|edges| {
                edges
                    .iter()
                    .map(|(&(from, to), &active)| Edge { from, to, active })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_edge_active(
        &self,
        game: GameId,
        from: AgentId,
        to: AgentId,
        active: bool,
    ) -> Result<()> {
        let mut tables = self.write();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        tables.edges.entry(game).or_default().insert((from, to), active);
        Ok(())
    }

    fn create_message(
        &self,
        game: GameId,
        from: AgentId,
        body: &str,
        recipients: &[AgentId],
        now: UnixMillis,
    ) -> Result<MessageId> {
        let mut tables = self.write();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        tables.next_message += 1;
        let id = MessageId(tables.next_message);
        tables.messages.entry(game).or_default().insert(
            id,
            Message {
                id,
                from,
                body: body.to_string(),
                sent_at: now,
                void: false,
            },
        );
        let deliveries = tables.deliveries.entry(game).or_default();
        for &to in recipients {
            deliveries.push(Delivery {
                message: id,
                to,
                state: DeliveryState::Pending,
            });
        }
        Ok(id)
    }

    fn drain_inbox(&self, game: GameId, to: AgentId) -> Result<Vec<InboxItem>> {
        let mut tables = self.write();
        let Tables {
            agents,
            messages,
            deliveries,
            ..
        } = &mut *tables;
        let messages = messages.entry(game).or_default();
        let mut drained = Vec::new();
        for delivery in deliveries.entry(game).or_default().iter_mut() {
            if delivery.to != to || delivery.state != DeliveryState::Pending {
                continue;
            }
            let Some(message) = messages.get(&delivery.message) else {
                continue;
            };
            if message.void {
                delivery.state = DeliveryState::Void;
                continue;
            }
            delivery.state = DeliveryState::Delivered;
            let from_name = agents
                .get(&message.from)
                .map(|a| a.display_name.clone())
                .unwrap_or_default();
            drained.push(InboxItem {
                message: message.id,
                from: message.from,
                from_name,
                body: message.body.clone(),
                sent_at: message.sent_at,
            });
        }
        Ok(drained)
    }

    fn void_agent_messages(&self, game: GameId, agent: AgentId) -> Result<()> {
        let mut tables = self.write();
        let Tables {
            messages,
            deliveries,
            ..
        } = &mut *tables;
        let messages = messages.entry(game).or_default();
        let mut from_agent = HashSet::new();
        for message in messages.values_mut() {
            if message.from == agent {
                message.void = true;
                from_agent.insert(message.id);
            }
        }
        for delivery in deliveries.entry(game).or_default().iter_mut() {
            if delivery.state == DeliveryState::Pending
                && (delivery.to == agent || from_agent.contains(&delivery.message))
            {
                delivery.state = DeliveryState::Void;
            }
        }
        Ok(())
    }

    fn broadcast_count(&self, game: GameId) -> Result<u64> {
        let tables = self.read();
        if !tables.games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        Ok(tables.broadcasts.get(&game).map_or(0, |b| b.len() as u64))
    }

    fn broadcast_at(&self, game: GameId, index: u64) -> Result<Option<Broadcast>> {
        Ok(self
            .read()
            .broadcasts
            .get(&game)
            .and_then(|b| b.get(index as usize))
            .copied())
    }

    fn latest_broadcast(&self, game: GameId) -> Result<Option<Broadcast>> {
        Ok(self
            .read()
            .broadcasts
            .get(&game)
            .and_then(|b| b.last())
            .copied())
    }

    fn begin_transition(&self, game: GameId) -> Result<bool> {
        if !self.read().games.contains_key(&game) {
            return Err(unknown_game(game));
        }
        Ok(self.slots().insert(game))
    }

    fn commit_transition(&self, game: GameId, commit: &TransitionCommit) -> Result<()> {
        let mut tables = self.write();
        if !self.slots().contains(&game) {
            return Err(Error::Invariant(format!(
                "commit without transition slot for game {game}"
            )));
        }
        let record = tables.games.get_mut(&game).ok_or_else(|| unknown_game(game))?;
        record.phase = commit.phase;
        record.winner = commit.winner;
        record.last_victim = commit.victim;
        record.elimination_count = commit.elimination_count;
        record.tie_break_draws = commit.tie_break_draws;
        tables.broadcasts.entry(game).or_default().push(Broadcast {
            phase: commit.phase,
            victim: commit.victim,
            at: commit.at,
            draws: commit.tie_break_draws,
        });
        self.slots().remove(&game);
        Ok(())
    }

    fn abort_transition(&self, game: GameId) -> Result<()> {
        self.slots().remove(&game);
        Ok(())
    }
}
