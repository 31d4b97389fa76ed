//! HTTP API for a Nightfall node.
//!
//! Clients drive the whole game through this surface: they join, chat,
//! vote, and poll the phase clock. The phase endpoint doubles as the
//! game's heartbeat, so clients are expected to hit it continuously.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use nightfall_clock::Phase;
use nightfall_engine::{Agent, AgentId, Error as EngineError, GameId, PollRequest, RosterScope};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::names;
use crate::node::NodeState;

type AppState = Arc<NodeState>;

/// How many pseudonyms to try before giving up on a collision streak.
const NAME_ATTEMPTS: usize = 8;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api/v1 for compatibility)
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        // Games
        .route("/api/v1/games", post(create_game))
        .route("/api/v1/games/default", get(default_game))
        .route("/api/v1/games/:game/agents", post(join_game))
        // Phase clock; polled continuously by every client
        .route("/api/v1/phase/:game/:agent/:switches/:phase", get(poll_phase))
        // Roster, scoped to what the requester may see
        .route("/api/v1/participants/:game/:agent/:scope", get(list_participants))
        // Votes and chat
        .route("/api/v1/games/:game/votes", post(cast_vote))
        .route("/api/v1/games/:game/messages", post(send_message))
        .route("/api/v1/games/:game/inbox/:agent", get(drain_inbox))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Map an engine error onto an HTTP status, logging the rejection.
fn reject(err: EngineError) -> StatusCode {
    tracing::warn!(%err, "request rejected");
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Store(_) | EngineError::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

// --- Game endpoints ---

#[derive(Debug, Serialize)]
struct GameResponse {
    game_id: u64,
}

async fn create_game(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<GameResponse>), StatusCode> {
    let game = state.moderator.create_game().map_err(reject)?;
    Ok((StatusCode::CREATED, Json(GameResponse { game_id: game.id.0 })))
}

async fn default_game(State(state): State<AppState>) -> Json<GameResponse> {
    Json(GameResponse {
        game_id: state.default_game.0,
    })
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    /// Omitted in normal play; the node hands out a pseudonym.
    #[serde(default)]
    requested_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct JoinResponse {
    agent_id: u64,
    display_name: String,
    faction: String,
}

async fn join_game(
    State(state): State<AppState>,
    Path(game): Path<u64>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<JoinResponse>), StatusCode> {
    let game = GameId(game);
    let agent = match req.requested_name {
        Some(name) => state.moderator.join(game, &name).map_err(reject)?,
        None => join_under_pseudonym(&state, game).map_err(reject)?,
    };
    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            agent_id: agent.id.0,
            display_name: agent.display_name,
            faction: agent.faction.as_str().to_string(),
        }),
    ))
}

fn join_under_pseudonym(state: &NodeState, game: GameId) -> Result<Agent, EngineError> {
    let mut rng = rand::thread_rng();
    let mut attempt = names::generate(&mut rng);
    for _ in 0..NAME_ATTEMPTS {
        match state.moderator.join(game, &attempt) {
            Err(EngineError::InvalidInput(msg)) if msg.contains("already taken") => {
                attempt = names::generate(&mut rng);
            }
            outcome => return outcome,
        }
    }
    Err(EngineError::InvalidInput(format!(
        "could not find a free pseudonym for game {game}"
    )))
}

// --- Phase endpoint ---

#[derive(Debug, Serialize)]
struct PhaseResponse {
    phase: Phase,
    seconds_remaining: i64,
    victim_name: Option<String>,
    victim_faction: Option<String>,
    winner: Option<String>,
}

async fn poll_phase(
    State(state): State<AppState>,
    Path((game, agent, switches, phase)): Path<(u64, u64, u64, String)>,
) -> Result<Json<PhaseResponse>, StatusCode> {
    let observed_phase: Phase = phase.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let reply = state
        .moderator
        .poll(&PollRequest {
            game: GameId(game),
            agent: AgentId(agent),
            observed_switches: switches,
            observed_phase,
        })
        .map_err(reject)?;
    Ok(Json(PhaseResponse {
        phase: reply.phase,
        seconds_remaining: reply.seconds_remaining,
        victim_name: reply.victim_name,
        victim_faction: reply.victim_faction.map(|f| f.as_str().to_string()),
        winner: reply.winner.map(|f| f.winner_name().to_string()),
    }))
}

// --- Roster endpoint ---

#[derive(Debug, Serialize)]
struct ParticipantsResponse {
    participants: Vec<String>,
}

async fn list_participants(
    State(state): State<AppState>,
    Path((game, agent, scope)): Path<(u64, u64, String)>,
) -> Result<Json<ParticipantsResponse>, StatusCode> {
    let scope = parse_scope(&scope).ok_or(StatusCode::BAD_REQUEST)?;
    let requester = AgentId(agent);
    let roster = state
        .moderator
        .roster(GameId(game), requester, scope)
        .map_err(reject)?;
    let mut participants = roster_names(&roster, requester);
    // Shuffled so list order never leaks join order or faction
    participants.shuffle(&mut rand::thread_rng());
    Ok(Json(ParticipantsResponse { participants }))
}

fn parse_scope(scope: &str) -> Option<RosterScope> {
    match scope {
        "all" => Some(RosterScope::Everyone),
        "mafia" => Some(RosterScope::MafiaOnly),
        _ => None,
    }
}

fn roster_names(roster: &[Agent], requester: AgentId) -> Vec<String> {
    roster
        .iter()
        .map(|a| {
            if a.id == requester {
                format!("{} (you!)", a.display_name)
            } else {
                a.display_name.clone()
            }
        })
        .collect()
}

// --- Vote endpoint ---

#[derive(Debug, Deserialize)]
struct VoteRequest {
    voter_id: u64,
    /// Targets are named, not numbered; clients only know pseudonyms.
    target_name: String,
}

async fn cast_vote(
    State(state): State<AppState>,
    Path(game): Path<u64>,
    Json(req): Json<VoteRequest>,
) -> Result<StatusCode, StatusCode> {
    let game = GameId(game);
    let target = state
        .moderator
        .agent_by_name(game, &req.target_name)
        .map_err(reject)?;
    state
        .moderator
        .cast_vote(game, AgentId(req.voter_id), target.id)
        .map_err(reject)?;
    Ok(StatusCode::CREATED)
}

// --- Chat endpoints ---

#[derive(Debug, Deserialize)]
struct MessageRequest {
    from_id: u64,
    body: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message_id: u64,
}

async fn send_message(
    State(state): State<AppState>,
    Path(game): Path<u64>,
    Json(req): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), StatusCode> {
    if req.body.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = state
        .moderator
        .send_message(GameId(game), AgentId(req.from_id), &req.body)
        .map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse { message_id: id.0 }),
    ))
}

#[derive(Debug, Serialize)]
struct InboxMessage {
    from: String,
    body: String,
    sent_at: i64,
}

#[derive(Debug, Serialize)]
struct InboxResponse {
    messages: Vec<InboxMessage>,
}

async fn drain_inbox(
    State(state): State<AppState>,
    Path((game, agent)): Path<(u64, u64)>,
) -> Result<Json<InboxResponse>, StatusCode> {
    let items = state
        .moderator
        .drain_inbox(GameId(game), AgentId(agent))
        .map_err(reject)?;
    Ok(Json(InboxResponse {
        messages: items
            .into_iter()
            .map(|item| InboxMessage {
                from: item.from_name,
                body: item.body,
                sent_at: item.sent_at,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_engine::Faction;

    fn agent(id: u64, name: &str) -> Agent {
        Agent {
            id: AgentId(id),
            game: GameId(1),
            faction: Faction::Bystander,
            display_name: name.to_string(),
            alive: true,
            elimination_rank: None,
            joined_at: 0,
        }
    }

    #[test]
    fn scope_strings_map_to_roster_scopes() {
        assert_eq!(parse_scope("all"), Some(RosterScope::Everyone));
        assert_eq!(parse_scope("mafia"), Some(RosterScope::MafiaOnly));
        assert_eq!(parse_scope("ghosts"), None);
    }

    #[test]
    fn roster_marks_the_requester() {
        let roster = vec![agent(1, "Quinn Rook"), agent(2, "Wren Vale")];
        let names = roster_names(&roster, AgentId(2));
        assert_eq!(names, vec!["Quinn Rook", "Wren Vale (you!)"]);
    }

    #[test]
    fn phase_response_serializes_with_null_placeholders() {
        let body = serde_json::to_value(PhaseResponse {
            phase: Phase::Night,
            seconds_remaining: 42,
            victim_name: None,
            victim_faction: None,
            winner: None,
        })
        .unwrap();
        assert_eq!(body["phase"], "night");
        assert_eq!(body["seconds_remaining"], 42);
        assert!(body["victim_name"].is_null());
        assert!(body["winner"].is_null());
    }

    #[test]
    fn engine_errors_map_to_client_statuses() {
        assert_eq!(
            reject(EngineError::NotFound("gone".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            reject(EngineError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            reject(EngineError::Conflict("raced".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            reject(EngineError::Invariant("broken".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
