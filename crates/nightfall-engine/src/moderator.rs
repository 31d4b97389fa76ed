//! The moderator.
//!
//! One moderator per process fronts every game in the store. It owns the
//! schedule, the wall-clock seam, and the process's randomness stream,
//! and composes the clock, tally, cascade, win check, and rewiring into
//! the transition pipeline. Polls are its public heartbeat: every client
//! polls every second, any poll may realize a due phase switch, and the
//! replay guard makes sure only one of them does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use nightfall_clock::{Phase, PhaseSchedule};
use tracing::{error, info, warn};

use crate::cascade;
use crate::draws::DrawStream;
use crate::error::{Error, Result};
use crate::model::{
    Agent, AgentId, Faction, Game, GameId, GameRules, InboxItem, MessageId, UnixMillis, Vote,
};
use crate::replay::{Arbitration, ReplayGuard, TransitionSlot};
use crate::store::{AgentFilter, GameStore, TransitionCommit};
use crate::tally;
use crate::time::TimeSource;
use crate::topology;
use crate::win;

/// How long a poller that found the transition slot busy sleeps before
/// re-reading the persisted state.
const BUSY_RETRY: Duration = Duration::from_millis(50);

/// One client's poll.
#[derive(Debug, Clone, Copy)]
pub struct PollRequest {
    pub game: GameId,
    pub agent: AgentId,
    /// How many phase switches this client has seen so far.
    pub observed_switches: u64,
    /// The phase the client believes it is in.
    pub observed_phase: Phase,
}

/// What every poller gets back, replay or authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReply {
    pub phase: Phase,
    pub seconds_remaining: i64,
    pub victim_name: Option<String>,
    pub victim_faction: Option<Faction>,
    pub winner: Option<Faction>,
}

/// Which agents a roster request may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterScope {
    Everyone,
    MafiaOnly,
}

struct DrawLedger {
    stream: Box<dyn DrawStream>,
    /// Per game, how many realized switches this process has accounted
    /// for, by drawing or by discarding.
    accounted: HashMap<GameId, u64>,
}

/// Orchestrates games end to end.
pub struct Moderator {
    store: Arc<dyn GameStore>,
    clock: Arc<dyn TimeSource>,
    schedule: PhaseSchedule,
    rules: GameRules,
    draws: Mutex<DrawLedger>,
}

impl Moderator {
    pub fn new(
        store: Arc<dyn GameStore>,
        clock: Arc<dyn TimeSource>,
        schedule: PhaseSchedule,
        rules: GameRules,
        stream: Box<dyn DrawStream>,
    ) -> Self {
        Self {
            store,
            clock,
            schedule,
            rules,
            draws: Mutex::new(DrawLedger {
                stream,
                accounted: HashMap::new(),
            }),
        }
    }

    pub fn schedule(&self) -> &PhaseSchedule {
        &self.schedule
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Draws the process stream has handed out so far, for diagnostics.
    pub fn draws_taken(&self) -> u64 {
        self.draws().stream.taken()
    }

    pub fn create_game(&self) -> Result<Game> {
        let game = self.store.create_game(self.clock.now_ms())?;
        info!(game = %game.id, "game created");
        Ok(game)
    }

    pub fn game(&self, game: GameId) -> Result<Game> {
        self.store.load_game(game)
    }

    pub fn agent(&self, agent: AgentId) -> Result<Agent> {
        self.store.get_agent(agent)
    }

    pub fn agent_by_name(&self, game: GameId, display_name: &str) -> Result<Agent> {
        self.store
            .find_agent_by_name(game, display_name)?
            .ok_or_else(|| Error::NotFound(format!("no agent named {display_name:?}")))
    }

    /// Add an agent to a game's roster.
    ///
    /// The mafia quota fills first, then bystanders. The joiner that
    /// completes the roster starts the game clock.
    pub fn join(&self, game: GameId, display_name: &str) -> Result<Agent> {
        let record = self.store.load_game(game)?;
        if record.is_over() {
            return Err(Error::InvalidInput(format!("game {game} is finished")));
        }
        let roster = self.store.list_agents(game, AgentFilter::All)?;
        if roster.len() >= self.rules.group_size {
            return Err(Error::InvalidInput(format!("game {game} is full")));
        }
        let mafia_so_far = roster.iter().filter(|a| a.faction == Faction::Mafia).count();
        let faction = if mafia_so_far < self.rules.mafia_quota {
            Faction::Mafia
        } else {
            Faction::Bystander
        };

        let now = self.clock.now_ms();
        let agent = self.store.create_agent(game, faction, display_name, now)?;
        if faction == Faction::Mafia {
            topology::wire_mafia_join(&*self.store, game, agent.id)?;
        }
        info!(%game, agent = %agent.id, %faction, "agent joined");

        if roster.len() + 1 >= self.rules.group_size {
            let mut record = self.store.load_game(game)?;
            if record.started_at.is_none() {
                record.started_at = Some(now);
                self.store.persist_game(&record)?;
                info!(%game, "roster full, clock started");
            }
        }
        Ok(agent)
    }

    /// Living agents visible to `requester`, in join order. The mafia
    /// scope is the faction's private channel and is refused to others.
    pub fn roster(
        &self,
        game: GameId,
        requester: AgentId,
        scope: RosterScope,
    ) -> Result<Vec<Agent>> {
        let requester = self.member(game, requester)?;
        let filter = match scope {
            RosterScope::Everyone => AgentFilter::Living,
            RosterScope::MafiaOnly => {
                if requester.faction != Faction::Mafia {
                    return Err(Error::InvalidInput(
                        "only the mafia may list the mafia".to_string(),
                    ));
                }
                AgentFilter::LivingOf(Faction::Mafia)
            }
        };
        self.store.list_agents(game, filter)
    }

    /// Record a vote. Eliminated agents may not vote; votes for
    /// eliminated targets are recorded and dropped later by the tally.
    pub fn cast_vote(&self, game: GameId, voter: AgentId, target: AgentId) -> Result<()> {
        let voter = self.member(game, voter)?;
        if !voter.alive {
            return Err(Error::InvalidInput(format!(
                "eliminated agent {} cannot vote",
                voter.id
            )));
        }
        let target = self.member(game, target)?;
        let vote = Vote {
            voter: voter.id,
            target: target.id,
            cast_at: self.clock.now_ms(),
        };
        self.store.record_vote(game, vote)
    }

    /// Fan a message out along the sender's active edges. Returns the
    /// message id; a sender with no active edges reaches nobody but the
    /// message is still recorded.
    pub fn send_message(&self, game: GameId, from: AgentId, body: &str) -> Result<MessageId> {
        let sender = self.member(game, from)?;
        if !sender.alive {
            return Err(Error::InvalidInput(format!(
                "eliminated agent {} cannot send messages",
                sender.id
            )));
        }
        let recipients: Vec<AgentId> = self
            .store
            .list_edges(game)?
            .into_iter()
            .filter(|e| e.active && e.from == sender.id)
            .map(|e| e.to)
            .collect();
        self.store
            .create_message(game, sender.id, body, &recipients, self.clock.now_ms())
    }

    /// Hand over everything pending for an agent, oldest first.
    pub fn drain_inbox(&self, game: GameId, agent: AgentId) -> Result<Vec<InboxItem>> {
        let agent = self.member(game, agent)?;
        self.store.drain_inbox(game, agent.id)
    }

    /// Answer one poll, realizing the pending phase switch if this poll
    /// is the first to observe it.
    pub fn poll(&self, req: &PollRequest) -> Result<PollReply> {
        let game = self.store.load_game(req.game)?;
        self.member(req.game, req.agent)?;

        if game.is_over() {
            return self.terminal_reply(&game);
        }
        let Some(started_at) = game.started_at else {
            // lobby: the clock starts when the roster fills
            return Ok(PollReply {
                phase: Phase::Night,
                seconds_remaining: self.schedule.lead_in_secs() + self.schedule.night_secs(),
                victim_name: None,
                victim_faction: None,
                winner: None,
            });
        };

        let authoritative = self.store.broadcast_count(req.game)?;
        if req.observed_phase != Phase::for_switches(req.observed_switches) {
            warn!(
                game = %req.game,
                agent = %req.agent,
                observed_phase = %req.observed_phase,
                observed_switches = req.observed_switches,
                "poll carries a phase inconsistent with its switch count"
            );
        }
        if req.observed_switches > authoritative {
            warn!(
                game = %req.game,
                agent = %req.agent,
                observed_switches = req.observed_switches,
                authoritative,
                "poll claims more switches than the ledger holds"
            );
        }

        let elapsed_secs = self.elapsed_secs(started_at);
        if !self.schedule.boundary_crossed(elapsed_secs, authoritative) {
            return self.report(&game, elapsed_secs, authoritative, req.observed_switches);
        }

        match ReplayGuard::new(&*self.store, req.game).arbitrate(authoritative)? {
            Arbitration::Execute(slot) => {
                match self.execute_transition(&game, slot, authoritative) {
                    Ok(()) => {}
                    Err(Error::Invariant(violation)) => {
                        // serve the last known-good state instead of
                        // propagating corruption
                        error!(game = %req.game, %violation, "transition aborted");
                    }
                    Err(other) => return Err(other),
                }
            }
            Arbitration::Replayed => {}
            Arbitration::Busy => std::thread::sleep(BUSY_RETRY),
        }

        self.align_draws(req.game)?;
        let game = self.store.load_game(req.game)?;
        let authoritative = self.store.broadcast_count(req.game)?;
        let elapsed_secs = self.elapsed_secs(started_at);
        self.report(&game, elapsed_secs, authoritative, req.observed_switches)
    }

    fn member(&self, game: GameId, agent: AgentId) -> Result<Agent> {
        let record = self.store.get_agent(agent)?;
        if record.game != game {
            return Err(Error::InvalidInput(format!(
                "agent {agent} does not belong to game {game}"
            )));
        }
        Ok(record)
    }

    fn elapsed_secs(&self, started_at: UnixMillis) -> i64 {
        (self.clock.now_ms() - started_at) / 1000
    }

    fn draws(&self) -> std::sync::MutexGuard<'_, DrawLedger> {
        self.draws.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discard draws for realized switches this process never accounted
    /// for, keeping its stream position reproducible across replays.
    fn align_draws(&self, game: GameId) -> Result<()> {
        let authoritative = self.store.broadcast_count(game)?;
        let mut ledger = self.draws();
        let DrawLedger { stream, accounted } = &mut *ledger;
        let done = accounted.entry(game).or_insert(0);
        while *done < authoritative {
            let Some(broadcast) = self.store.broadcast_at(game, *done)? else {
                break;
            };
            stream.discard(broadcast.draws);
            *done += 1;
        }
        Ok(())
    }

    /// Run the full pipeline for the boundary after `switches` realized
    /// switches and commit it. The caller holds the transition slot;
    /// dropping it on any error path aborts cleanly.
    fn execute_transition(
        &self,
        game: &Game,
        slot: TransitionSlot<'_>,
        switches: u64,
    ) -> Result<()> {
        let closing = Phase::for_switches(switches);
        if game.phase != closing {
            return Err(Error::Invariant(format!(
                "game {} is recorded in {} but its ledger implies {}",
                game.id, game.phase, closing
            )));
        }
        let opening = closing.flipped();
        let now = self.clock.now_ms();

        let phase_start = match self.store.latest_broadcast(game.id)? {
            Some(broadcast) => broadcast.at,
            None => game.started_at.unwrap_or(game.created_at),
        };
        let living = self.store.list_agents(game.id, AgentFilter::Living)?;
        let living_ids: Vec<AgentId> = living.iter().map(|a| a.id).collect();
        let eligible: Vec<AgentId> = match closing {
            Phase::Day => living_ids.clone(),
            Phase::Night => living
                .iter()
                .filter(|a| a.faction == Faction::Mafia)
                .map(|a| a.id)
                .collect(),
        };
        let votes = self.store.votes_since(game.id, phase_start)?;

        self.align_draws(game.id)?;
        let outcome = {
            let mut ledger = self.draws();
            let DrawLedger { stream, accounted } = &mut *ledger;
            let outcome = tally::resolve(&votes, &eligible, &living_ids, stream.as_mut());
            // the stream has moved for this boundary even if the commit
            // below loses or fails
            accounted.insert(game.id, switches + 1);
            outcome
        };

        let mut elimination_count = game.elimination_count;
        if let Some(victim) = outcome.victim {
            elimination_count += 1;
            cascade::eliminate(&*self.store, game.id, victim, elimination_count)?;
        }

        let mafia = self
            .store
            .list_agents(game.id, AgentFilter::LivingOf(Faction::Mafia))?
            .len();
        let living_after = self.store.list_agents(game.id, AgentFilter::Living)?.len();
        let winner = win::evaluate(mafia, living_after - mafia);

        if winner.is_none() {
            match opening {
                Phase::Day => {
                    topology::rewire_for_day(&*self.store, game.id)?;
                }
                Phase::Night => {
                    topology::rewire_for_night(&*self.store, game.id)?;
                }
            }
        }

        slot.commit(&TransitionCommit {
            phase: opening,
            victim: outcome.victim,
            winner,
            elimination_count,
            tie_break_draws: outcome.draws_consumed,
            at: now,
        })?;
        info!(
            game = %game.id,
            from = %closing,
            to = %opening,
            victim = ?outcome.victim,
            winner = ?winner,
            "phase switch realized"
        );
        Ok(())
    }

    /// Build the reply for the current persisted state.
    ///
    /// A client behind the ledger is caught up one switch per poll: it is
    /// told about the oldest broadcast it has not seen, phase and victim
    /// included, and learns the winner only once it reaches the final
    /// broadcast. A caught-up client gets the live countdown.
    fn report(
        &self,
        game: &Game,
        elapsed_secs: i64,
        authoritative: u64,
        observed: u64,
    ) -> Result<PollReply> {
        let countdown = self.schedule.countdown(elapsed_secs, authoritative);
        let seconds_remaining = if game.is_over() { 0 } else { countdown.remaining };
        if observed < authoritative {
            let Some(broadcast) = self.store.broadcast_at(game.id, observed)? else {
                return Err(Error::Invariant(format!(
                    "broadcast {observed} missing from a ledger of {authoritative} for game {}",
                    game.id
                )));
            };
            let (victim_name, victim_faction) = self.victim_details(broadcast.victim)?;
            let reporting_latest = observed + 1 == authoritative;
            Ok(PollReply {
                phase: broadcast.phase,
                seconds_remaining,
                victim_name,
                victim_faction,
                winner: if reporting_latest { game.winner } else { None },
            })
        } else {
            Ok(PollReply {
                phase: countdown.phase,
                seconds_remaining,
                victim_name: None,
                victim_faction: None,
                winner: game.winner,
            })
        }
    }

    fn terminal_reply(&self, game: &Game) -> Result<PollReply> {
        let (victim_name, victim_faction) = self.victim_details(game.last_victim)?;
        Ok(PollReply {
            phase: game.phase,
            seconds_remaining: 0,
            victim_name,
            victim_faction,
            winner: game.winner,
        })
    }

    fn victim_details(&self, victim: Option<AgentId>) -> Result<(Option<String>, Option<Faction>)> {
        match victim {
            Some(id) => {
                let agent = self.store.get_agent(id)?;
                Ok((Some(agent.display_name), Some(agent.faction)))
            }
            None => Ok((None, None)),
        }
    }
}
