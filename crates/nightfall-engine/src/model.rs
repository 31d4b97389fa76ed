//! Game state records.
//!
//! Every piece of game state the engine persists is a typed record here.
//! The store keeps them; the engine modules read and rewrite them. All
//! timestamps are Unix milliseconds, clock math happens in whole seconds.

use std::fmt;

use nightfall_clock::Phase;

/// Unix timestamp in milliseconds.
pub type UnixMillis = i64;

/// Identifier for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(pub u64);

/// Identifier for one agent within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

/// Identifier for one relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Mafia,
    Bystander,
}

impl Faction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Faction::Mafia => "mafia",
            Faction::Bystander => "bystander",
        }
    }

    /// The name used when announcing this faction as the winner.
    pub const fn winner_name(self) -> &'static str {
        match self {
            Faction::Mafia => "mafia",
            Faction::Bystander => "bystanders",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: AgentId,
    pub game: GameId,
    pub faction: Faction,
    /// Unique within the game; votes and rosters refer to agents by name.
    pub display_name: String,
    pub alive: bool,
    /// 1-based order of elimination, set when the agent dies.
    pub elimination_rank: Option<u32>,
    pub joined_at: UnixMillis,
}

impl Agent {
    pub fn is_living(&self, faction: Faction) -> bool {
        self.alive && self.faction == faction
    }
}

/// One cast vote. Agents may revote; the tally keeps only the latest
/// vote per voter within the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub voter: AgentId,
    pub target: AgentId,
    pub cast_at: UnixMillis,
}

/// A directed communication channel between two agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: AgentId,
    pub to: AgentId,
    pub active: bool,
}

/// A message one agent sent into its active edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub from: AgentId,
    pub body: String,
    pub sent_at: UnixMillis,
    /// Set when the sender is eliminated; void messages are never delivered.
    pub void: bool,
}

/// Delivery status of one message copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Delivered,
    Void,
}

/// One undelivered or delivered copy of a message, addressed to a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub message: MessageId,
    pub to: AgentId,
    pub state: DeliveryState,
}

/// A delivered message as handed to its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxItem {
    pub message: MessageId,
    pub from: AgentId,
    pub from_name: String,
    pub body: String,
    pub sent_at: UnixMillis,
}

/// The public record of one realized phase switch. The append-only
/// broadcast ledger is the authoritative switch count for its game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Broadcast {
    /// The phase this switch opened.
    pub phase: Phase,
    /// Who the closing phase's vote eliminated, if anyone.
    pub victim: Option<AgentId>,
    pub at: UnixMillis,
    /// Tie-break draws the producing transition consumed, kept so other
    /// processes can advance their streams past this switch.
    pub draws: u32,
}

/// Top-level state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    /// Current phase; always agrees with the broadcast count's parity.
    pub phase: Phase,
    pub winner: Option<Faction>,
    pub last_victim: Option<AgentId>,
    /// Total eliminations so far; the next victim gets rank + 1.
    pub elimination_count: u32,
    /// Draws consumed by the most recent transition.
    pub tie_break_draws: u32,
    /// Set once the roster fills; the phase clock runs from this instant.
    pub started_at: Option<UnixMillis>,
    pub created_at: UnixMillis,
}

impl Game {
    /// A fresh game in its opening night, waiting for agents.
    pub fn new(id: GameId, created_at: UnixMillis) -> Self {
        Self {
            id,
            phase: Phase::Night,
            winner: None,
            last_victim: None,
            elimination_count: 0,
            tie_break_draws: 0,
            started_at: None,
            created_at,
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// Roster composition rules for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Agents required before the clock starts.
    pub group_size: usize,
    /// Agents assigned to the mafia, filled before any bystander joins.
    pub mafia_quota: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            group_size: 4,
            mafia_quota: 1,
        }
    }
}
