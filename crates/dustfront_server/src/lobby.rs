//! Lobby and matchmaking: game lifecycle, slot reservation tokens, and
//! the background sweeper.
//!
//! The active-games and matchmaking maps are shared between HTTP
//! handlers, WebSocket handlers, and the sweeper; all of them take the
//! `RwLock` briefly and never hold it across a game tick (the runner
//! owns the game, the lobby only holds handles).

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use dustfront_core::config::GameConfig;
use dustfront_core::error::GameError;
use dustfront_core::factions::FactionKind;
use dustfront_core::game::{GameSetup, PlayerSlot};
use dustfront_core::map::{Biome, Density};
use dustfront_core::units::PlayerId;

use crate::runner::{spawn_game, GameHandle};
use crate::{GameId, ServerConfig};

/// Sweeper cadence.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);
/// Active games with no connected players are removed after this long.
const EMPTY_GAME_TTL: Duration = Duration::from_secs(5 * 60);
/// Matchmaking games that never fill are removed after this long.
const MATCHMAKING_TTL: Duration = Duration::from_secs(10 * 60);

/// Opaque session reservation token.
pub type SessionToken = String;

/// One reserved slot in a matchmaking game.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// The reservation token.
    pub token: SessionToken,
    /// Player id assigned at reservation time.
    pub player: PlayerId,
    /// Chosen faction.
    pub faction: FactionKind,
    /// Slot index.
    pub slot: usize,
}

/// A game gathering players before start.
#[derive(Debug)]
struct MatchmakingGame {
    created_at: Instant,
    biome: Biome,
    density: Density,
    max_players: usize,
    reservations: Vec<Reservation>,
}

/// What a session token resolves to at handshake time.
#[derive(Debug, Clone)]
pub struct TokenBinding {
    /// The game the token belongs to.
    pub game_id: GameId,
    /// The bound player.
    pub player: PlayerId,
    /// The reserved slot.
    pub slot: usize,
}

/// Successful matchmaking join.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    /// The game joined.
    pub game_id: GameId,
    /// Token to present on the WebSocket handshake.
    pub session_token: SessionToken,
}

/// The server-wide lobby.
pub struct Lobby {
    config: ServerConfig,
    games: RwLock<HashMap<GameId, GameHandle>>,
    matchmaking: RwLock<HashMap<GameId, MatchmakingGame>>,
    tokens: RwLock<HashMap<SessionToken, TokenBinding>>,
    player_counter: AtomicU32,
}

impl Lobby {
    /// Create an empty lobby.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            games: RwLock::new(HashMap::new()),
            matchmaking: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            player_counter: AtomicU32::new(1),
        }
    }

    /// Create a new matchmaking game. Rejects above the global cap.
    pub async fn create_game(
        &self,
        biome: Biome,
        density: Density,
        max_players: usize,
    ) -> Result<GameId, GameError> {
        let active = self.games.read().await.len();
        let mut matchmaking = self.matchmaking.write().await;
        if active + matchmaking.len() >= self.config.max_games {
            return Err(GameError::GameCapReached(self.config.max_games));
        }

        let game_id = Uuid::new_v4().to_string();
        let max_players = max_players.clamp(2, self.config.max_players as usize);
        matchmaking.insert(
            game_id.clone(),
            MatchmakingGame {
                created_at: Instant::now(),
                biome,
                density,
                max_players,
                reservations: Vec::new(),
            },
        );
        tracing::info!(%game_id, max_players, "matchmaking game created");
        Ok(game_id)
    }

    /// Reserve a slot, creating a new matchmaking game when `game_id`
    /// is `None`. Starts the game the moment it fills.
    pub async fn join_matchmaking(
        &self,
        game_id: Option<GameId>,
        biome: Biome,
        density: Density,
        faction: FactionKind,
        max_players: usize,
    ) -> Result<JoinResult, GameError> {
        let game_id = match game_id {
            Some(id) => id,
            None => self.create_game(biome, density, max_players).await?,
        };

        let (result, ready_setup) = {
            let mut matchmaking = self.matchmaking.write().await;
            let game = matchmaking
                .get_mut(&game_id)
                .ok_or(GameError::InvalidState("unknown matchmaking game".into()))?;
            if game.reservations.len() >= game.max_players {
                return Err(GameError::GameFull(game.max_players));
            }

            let player = self.player_counter.fetch_add(1, Ordering::Relaxed);
            let token = Uuid::new_v4().to_string();
            let slot = game.reservations.len();
            game.reservations.push(Reservation {
                token: token.clone(),
                player,
                faction,
                slot,
            });

            let result = JoinResult {
                game_id: game_id.clone(),
                session_token: token.clone(),
            };
            self.tokens.write().await.insert(
                token,
                TokenBinding {
                    game_id: game_id.clone(),
                    player,
                    slot,
                },
            );

            if game.reservations.len() == game.max_players {
                let game = matchmaking.remove(&game_id).unwrap();
                (result, Some(game))
            } else {
                (result, None)
            }
        };

        if let Some(game) = ready_setup {
            self.start_game(&game_id, game).await;
        }
        Ok(result)
    }

    /// Release a reservation. Removes the matchmaking game when its
    /// last reservation leaves.
    pub async fn leave_matchmaking(&self, game_id: &str, token: &str) -> bool {
        let mut matchmaking = self.matchmaking.write().await;
        let Some(game) = matchmaking.get_mut(game_id) else {
            return false;
        };
        let before = game.reservations.len();
        game.reservations.retain(|r| r.token != token);
        let removed = game.reservations.len() < before;
        if removed {
            self.tokens.write().await.remove(token);
            if game.reservations.is_empty() {
                matchmaking.remove(game_id);
                tracing::info!(game_id, "empty matchmaking game removed");
            }
        }
        removed
    }

    /// True once the game has filled and started.
    pub async fn is_game_ready(&self, game_id: &str) -> bool {
        self.games.read().await.contains_key(game_id)
    }

    /// Resolve a session token for the WebSocket handshake.
    pub async fn resolve_token(&self, game_id: &str, token: &str) -> Option<TokenBinding> {
        let bindings = self.tokens.read().await;
        let binding = bindings.get(token)?;
        (binding.game_id == game_id).then(|| binding.clone())
    }

    /// Handle to a running game.
    pub async fn game_handle(&self, game_id: &str) -> Option<GameHandle> {
        self.games.read().await.get(game_id).cloned()
    }

    /// Number of active games (tests and admin surface).
    pub async fn active_game_count(&self) -> usize {
        self.games.read().await.len()
    }

    async fn start_game(&self, game_id: &str, game: MatchmakingGame) {
        // Free-for-all: every slot is its own team.
        let players = game
            .reservations
            .iter()
            .map(|r| PlayerSlot {
                player: r.player,
                faction: r.faction,
                team: (r.slot + 1) as u8,
            })
            .collect();
        let setup = GameSetup {
            players,
            biome: game.biome,
            density: game.density,
            seed: seed_from_game_id(game_id),
            config: GameConfig::default(),
        };

        let handle = spawn_game(game_id.to_string(), setup);
        self.games.write().await.insert(game_id.to_string(), handle);
        tracing::info!(game_id, "matchmaking complete, game started");
    }

    /// One sweep pass: finished games, long-empty games, and
    /// matchmaking games that never filled.
    pub async fn sweep(&self) {
        let mut stale_tokens: Vec<SessionToken> = Vec::new();

        {
            let mut games = self.games.write().await;
            games.retain(|game_id, handle| {
                if handle.is_finished() {
                    tracing::info!(%game_id, "sweeping finished game");
                    return false;
                }
                if handle.attached_count() == 0 && handle.created_at.elapsed() > EMPTY_GAME_TTL {
                    tracing::info!(%game_id, "sweeping abandoned game");
                    handle.shutdown();
                    return false;
                }
                true
            });
        }

        {
            let mut matchmaking = self.matchmaking.write().await;
            matchmaking.retain(|game_id, game| {
                if game.created_at.elapsed() > MATCHMAKING_TTL {
                    tracing::info!(%game_id, "sweeping stale matchmaking game");
                    stale_tokens.extend(game.reservations.iter().map(|r| r.token.clone()));
                    return false;
                }
                true
            });
        }

        if !stale_tokens.is_empty() {
            let mut tokens = self.tokens.write().await;
            for token in stale_tokens {
                tokens.remove(&token);
            }
        }
    }

    /// Spawn the background sweeper task.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let lobby = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                lobby.sweep().await;
            }
        })
    }
}

fn seed_from_game_id(game_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    game_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> Lobby {
        Lobby::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn test_matchmaking_fills_and_starts() {
        let lobby = lobby();

        let first = lobby
            .join_matchmaking(None, Biome::Dunes, Density::Low, FactionKind::Coalition, 2)
            .await
            .unwrap();
        assert!(!lobby.is_game_ready(&first.game_id).await);

        let second = lobby
            .join_matchmaking(
                Some(first.game_id.clone()),
                Biome::Dunes,
                Density::Low,
                FactionKind::Nomads,
                2,
            )
            .await
            .unwrap();
        assert_eq!(first.game_id, second.game_id);
        assert_ne!(first.session_token, second.session_token);
        assert!(lobby.is_game_ready(&first.game_id).await);

        // A third join must fail with a full-game error.
        let third = lobby
            .join_matchmaking(
                Some(first.game_id.clone()),
                Biome::Dunes,
                Density::Low,
                FactionKind::Syndicate,
                2,
            )
            .await;
        assert!(third.is_err());

        // Tokens resolve to distinct players.
        let a = lobby
            .resolve_token(&first.game_id, &first.session_token)
            .await
            .unwrap();
        let b = lobby
            .resolve_token(&first.game_id, &second.session_token)
            .await
            .unwrap();
        assert_ne!(a.player, b.player);

        // Clean up the spawned runner.
        lobby.game_handle(&first.game_id).await.unwrap().shutdown();
    }

    #[tokio::test]
    async fn test_leave_matchmaking_releases_slot() {
        let lobby = lobby();
        let joined = lobby
            .join_matchmaking(None, Biome::Dunes, Density::Low, FactionKind::Coalition, 2)
            .await
            .unwrap();

        assert!(
            lobby
                .leave_matchmaking(&joined.game_id, &joined.session_token)
                .await
        );
        // Game removed when the last reservation leaves.
        assert!(
            lobby
                .join_matchmaking(
                    Some(joined.game_id.clone()),
                    Biome::Dunes,
                    Density::Low,
                    FactionKind::Coalition,
                    2,
                )
                .await
                .is_err()
        );
        assert!(
            lobby
                .resolve_token(&joined.game_id, &joined.session_token)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_game_cap() {
        let config = ServerConfig {
            max_games: 1,
            ..ServerConfig::default()
        };
        let lobby = Lobby::new(config);
        lobby
            .create_game(Biome::Dunes, Density::Low, 2)
            .await
            .unwrap();
        let err = lobby.create_game(Biome::Dunes, Density::Low, 2).await;
        assert!(matches!(err, Err(GameError::GameCapReached(1))));
    }

    #[tokio::test]
    async fn test_token_rejected_for_wrong_game() {
        let lobby = lobby();
        let joined = lobby
            .join_matchmaking(None, Biome::Dunes, Density::Low, FactionKind::Coalition, 2)
            .await
            .unwrap();
        assert!(
            lobby
                .resolve_token("other-game", &joined.session_token)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sweep_removes_finished_games() {
        let lobby = lobby();
        let first = lobby
            .join_matchmaking(None, Biome::Dunes, Density::Low, FactionKind::Coalition, 2)
            .await
            .unwrap();
        lobby
            .join_matchmaking(
                Some(first.game_id.clone()),
                Biome::Dunes,
                Density::Low,
                FactionKind::Nomads,
                2,
            )
            .await
            .unwrap();

        let mut handle = lobby.game_handle(&first.game_id).await.unwrap();
        handle.shutdown();
        let _ =
            tokio::time::timeout(Duration::from_secs(2), handle.finished.changed()).await;

        lobby.sweep().await;
        assert_eq!(lobby.active_game_count().await, 0);
    }
}
