//! HTTP and WebSocket surface.
//!
//! - `POST /api/rts/games`: create a matchmaking game.
//! - `POST /api/rts/matchmaking/join`: reserve a slot.
//! - `POST /api/rts/matchmaking/leave`: release a reservation.
//! - `GET  /api/rts/matchmaking/{gameId}/ready`: poll readiness.
//! - `GET  /api/rts/factions/{factionType}`: static faction catalog.
//! - `GET  /rts/{gameId}?sessionToken=...`: game WebSocket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use dustfront_core::data::faction_data;
use dustfront_core::error::GameError;
use dustfront_core::factions::FactionKind;
use dustfront_core::map;
use dustfront_core::units::PlayerId;

use crate::lobby::Lobby;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::runner::{GameControl, GameHandle};
use crate::session::session_channel;

/// Build the server router.
pub fn router(lobby: Arc<Lobby>) -> Router {
    Router::new()
        .route("/api/rts/games", post(create_game))
        .route("/api/rts/factions/:faction_type", get(faction_catalog))
        .route("/api/rts/matchmaking/join", post(join_matchmaking))
        .route("/api/rts/matchmaking/leave", post(leave_matchmaking))
        .route("/api/rts/matchmaking/:game_id/ready", get(game_ready))
        .route("/rts/:game_id", get(game_socket))
        .with_state(lobby)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateGameRequest {
    biome: Option<String>,
    density: Option<String>,
    max_players: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameResponse {
    game_id: String,
}

async fn create_game(
    State(lobby): State<Arc<Lobby>>,
    body: Option<Json<CreateGameRequest>>,
) -> Response {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let biome = map::biome_from_str(request.biome.as_deref().unwrap_or(""));
    let density = map::density_from_str(request.density.as_deref().unwrap_or(""));
    match lobby
        .create_game(biome, density, request.max_players.unwrap_or(2))
        .await
    {
        Ok(game_id) => Json(CreateGameResponse { game_id }).into_response(),
        Err(error) => error_response(&error),
    }
}

async fn faction_catalog(Path(faction_type): Path<String>) -> Response {
    match faction_type.parse::<FactionKind>() {
        Ok(kind) => Json(faction_data::catalog(kind)).into_response(),
        Err(()) => (StatusCode::NOT_FOUND, "unknown faction").into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JoinRequest {
    game_id: Option<String>,
    biome: Option<String>,
    density: Option<String>,
    faction: Option<String>,
    max_players: Option<usize>,
}

async fn join_matchmaking(
    State(lobby): State<Arc<Lobby>>,
    Json(request): Json<JoinRequest>,
) -> Response {
    let biome = map::biome_from_str(request.biome.as_deref().unwrap_or(""));
    let density = map::density_from_str(request.density.as_deref().unwrap_or(""));
    let faction = request
        .faction
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or(FactionKind::Coalition);

    match lobby
        .join_matchmaking(
            request.game_id,
            biome,
            density,
            faction,
            request.max_players.unwrap_or(2),
        )
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveRequest {
    game_id: String,
    session_token: String,
}

async fn leave_matchmaking(
    State(lobby): State<Arc<Lobby>>,
    Json(request): Json<LeaveRequest>,
) -> Response {
    if lobby
        .leave_matchmaking(&request.game_id, &request.session_token)
        .await
    {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "unknown reservation").into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadyResponse {
    ready: bool,
}

async fn game_ready(State(lobby): State<Arc<Lobby>>, Path(game_id): Path<String>) -> Response {
    Json(ReadyResponse {
        ready: lobby.is_game_ready(&game_id).await,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocketQuery {
    session_token: String,
}

async fn game_socket(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    Query(query): Query<SocketQuery>,
    State(lobby): State<Arc<Lobby>>,
) -> Response {
    let Some(binding) = lobby.resolve_token(&game_id, &query.session_token).await else {
        return (StatusCode::UNAUTHORIZED, "invalid session token").into_response();
    };
    let Some(handle) = lobby.game_handle(&game_id).await else {
        return (StatusCode::NOT_FOUND, "game not running").into_response();
    };

    ws.on_upgrade(move |socket| client_session(socket, handle, binding.player))
}

/// Drive one connected client: writer task forwards outbound messages,
/// the read loop validates frames and routes orders to the game.
async fn client_session(socket: WebSocket, handle: GameHandle, player: PlayerId) {
    let (sender, mut receiver) = session_channel(player);
    if handle.control.send(GameControl::Attach(sender.clone())).is_err() {
        tracing::warn!(player, game_id = %handle.game_id, "game gone before attach");
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(message) = receiver.next_message().await {
            if sink.send(Message::Text(message.to_json())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    if message.wants_pong() {
                        sender.send_event(ServerMessage::Pong);
                    }
                    if !message.input.is_empty()
                        && handle
                            .control
                            .send(GameControl::Input(player, message.input))
                            .is_err()
                    {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(player, %error, "malformed input frame dropped");
                }
            },
            Message::Close(_) => break,
            // Ping/pong are handled by the transport; binary is ignored.
            _ => {}
        }
    }

    let _ = handle.control.send(GameControl::Detach(player));
    writer.abort();
    tracing::debug!(player, game_id = %handle.game_id, "session closed");
}

fn error_response(error: &GameError) -> Response {
    let status = match error {
        GameError::GameFull(_) | GameError::GameCapReached(_) => StatusCode::CONFLICT,
        GameError::InvalidSessionToken => StatusCode::UNAUTHORIZED,
        GameError::EntityNotFound(_) | GameError::UnknownFaction(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, error.to_string()).into_response()
}
