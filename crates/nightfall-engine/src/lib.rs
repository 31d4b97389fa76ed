//! Nightfall Engine - Game Orchestration
//!
//! The synchronous core of a Nightfall deployment: a timed elimination
//! game in which a hidden mafia and the bystanders around them vote each
//! other out across alternating day and night phases. There is no
//! background scheduler; redundant client polls drive the game forward,
//! and the engine guarantees each phase switch is realized exactly once
//! no matter how many pollers observe it at the same time.
//!
//! # Architecture
//!
//! - **Model**: Typed records for games, agents, votes, edges, messages
//! - **Store**: The [`GameStore`] seam plus the in-memory implementation
//! - **Tally / Win / Cascade / Topology**: The transition pipeline stages
//! - **Replay**: At-most-once arbitration over due phase boundaries
//! - **Moderator**: The public contract composing all of the above
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nightfall_clock::{Phase, PhaseSchedule};
//! use nightfall_engine::{
//!     GameRules, MemoryStore, Moderator, PollRequest, SeededDraws, WallClock,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let moderator = Moderator::new(
//!     store,
//!     Arc::new(WallClock),
//!     PhaseSchedule::default(),
//!     GameRules::default(),
//!     Box::new(SeededDraws::default()),
//! );
//! let game = moderator.create_game()?;
//! let agent = moderator.join(game.id, "Ada Quinn")?;
//! let reply = moderator.poll(&PollRequest {
//!     game: game.id,
//!     agent: agent.id,
//!     observed_switches: 0,
//!     observed_phase: Phase::Night,
//! })?;
//! assert_eq!(reply.phase, Phase::Night);
//! # Ok::<(), nightfall_engine::Error>(())
//! ```

pub mod cascade;
pub mod draws;
pub mod error;
pub mod model;
pub mod moderator;
pub mod replay;
pub mod store;
pub mod tally;
pub mod time;
pub mod topology;
pub mod win;

pub use draws::{DrawStream, RecordingDraws, SeededDraws, DEFAULT_SEED};
pub use error::{Error, Result};
pub use model::{
    Agent, AgentId, Broadcast, Faction, Game, GameId, GameRules, InboxItem, Message, MessageId,
    UnixMillis, Vote,
};
pub use moderator::{Moderator, PollReply, PollRequest, RosterScope};
pub use store::{AgentFilter, GameStore, MemoryStore, TransitionCommit};
pub use tally::TallyOutcome;
pub use time::{ManualClock, TimeSource, WallClock};
