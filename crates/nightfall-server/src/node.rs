//! Node configuration and lifecycle.
//!
//! A node owns one in-memory engine and serves it over HTTP. It is
//! poll-driven: phase switches are realized by whichever client poll
//! first crosses a boundary, so there is no background scheduler to
//! spawn here.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use nightfall_clock::PhaseSchedule;
use nightfall_engine::{
    GameId, GameRules, GameStore, MemoryStore, Moderator, SeededDraws, WallClock, DEFAULT_SEED,
};
use tracing::info;

use crate::api;
use crate::error::{Error, Result};

/// Configuration for a Nightfall node.
#[derive(Debug, Clone)]
pub struct NightfallConfig {
    /// HTTP API listen address.
    pub api_addr: SocketAddr,
    /// Agents per game; the clock starts when the roster fills.
    pub group_size: usize,
    /// How many of those agents are seated as mafia.
    pub mafia_quota: usize,
    /// Day phase length in seconds.
    pub day_secs: i64,
    /// Night phase length in seconds.
    pub night_secs: i64,
    /// Pause between phases in seconds.
    pub break_secs: i64,
    /// Pause before the opening night in seconds.
    pub lead_in_secs: i64,
    /// Seed for the tie-break draw stream. Every node of a deployment
    /// must use the same seed.
    pub draw_seed: u64,
}

impl NightfallConfig {
    /// Build a config from `NIGHTFALL_*` environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Self {
        let api_addr = std::env::var("NIGHTFALL_API_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8600".to_string())
            .parse()
            .expect("Invalid NIGHTFALL_API_ADDR");

        Self {
            api_addr,
            group_size: env_or("NIGHTFALL_GROUP_SIZE", 4),
            mafia_quota: env_or("NIGHTFALL_MAFIA_QUOTA", 1),
            day_secs: env_or("NIGHTFALL_DAY_SECS", 150),
            night_secs: env_or("NIGHTFALL_NIGHT_SECS", 60),
            break_secs: env_or("NIGHTFALL_BREAK_SECS", 10),
            lead_in_secs: env_or("NIGHTFALL_LEAD_IN_SECS", 2),
            draw_seed: env_or("NIGHTFALL_DRAW_SEED", DEFAULT_SEED),
        }
    }
}

impl Default for NightfallConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Shared state behind every API handler.
pub struct NodeState {
    pub moderator: Moderator,
    /// Game created at boot so a fresh deployment is joinable
    /// without a create call.
    pub default_game: GameId,
}

/// A running Nightfall node.
pub struct NightfallNode {
    config: NightfallConfig,
    state: Arc<NodeState>,
}

impl NightfallNode {
    pub fn new(config: NightfallConfig) -> Result<Self> {
        if config.mafia_quota == 0 {
            return Err(Error::Config("mafia quota must be at least 1".into()));
        }
        if config.mafia_quota >= config.group_size {
            return Err(Error::Config(format!(
                "mafia quota {} leaves no bystanders in a group of {}",
                config.mafia_quota, config.group_size
            )));
        }

        let schedule = PhaseSchedule::new(
            config.day_secs,
            config.night_secs,
            config.break_secs,
            config.lead_in_secs,
        )?;
        let rules = GameRules {
            group_size: config.group_size,
            mafia_quota: config.mafia_quota,
        };
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let moderator = Moderator::new(
            store,
            Arc::new(WallClock),
            schedule,
            rules,
            Box::new(SeededDraws::new(config.draw_seed)),
        );
        let default_game = moderator.create_game()?.id;

        Ok(Self {
            config,
            state: Arc::new(NodeState {
                moderator,
                default_game,
            }),
        })
    }

    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Serve the HTTP API until the process is stopped.
    pub async fn run(self) -> Result<()> {
        info!("Nightfall node starting");
        info!("  API address: http://{}", self.config.api_addr);
        info!(
            "  Roster: {} agents, {} mafia",
            self.config.group_size, self.config.mafia_quota
        );
        info!(
            "  Schedule: day {}s / night {}s / break {}s / lead-in {}s",
            self.config.day_secs,
            self.config.night_secs,
            self.config.break_secs,
            self.config.lead_in_secs
        );
        info!(game = %self.state.default_game, "default game ready");

        let app = api::build_router(self.state());
        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NightfallConfig {
        NightfallConfig {
            api_addr: "127.0.0.1:0".parse().unwrap(),
            group_size: 4,
            mafia_quota: 1,
            day_secs: 150,
            night_secs: 60,
            break_secs: 10,
            lead_in_secs: 2,
            draw_seed: DEFAULT_SEED,
        }
    }

    #[test]
    fn node_boots_with_a_joinable_default_game() {
        let node = NightfallNode::new(config()).unwrap();
        let state = node.state();
        let game = state.moderator.game(state.default_game).unwrap();
        assert!(game.winner.is_none());
        let seat = state.moderator.join(game.id, "Early Bird").unwrap();
        assert_eq!(seat.display_name, "Early Bird");
    }

    #[test]
    fn quota_must_leave_room_for_bystanders() {
        let mut cfg = config();
        cfg.mafia_quota = 4;
        assert!(matches!(NightfallNode::new(cfg), Err(Error::Config(_))));

        let mut cfg = config();
        cfg.mafia_quota = 0;
        assert!(matches!(NightfallNode::new(cfg), Err(Error::Config(_))));
    }

    #[test]
    fn schedule_misconfiguration_is_rejected() {
        let mut cfg = config();
        cfg.day_secs = 0;
        assert!(matches!(NightfallNode::new(cfg), Err(Error::Config(_))));
    }
}
