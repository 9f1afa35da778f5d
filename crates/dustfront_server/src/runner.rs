//! Per-game runner task.
//!
//! Each active game runs on its own tokio task with a fixed 60 Hz
//! interval. Control messages (inputs, session attach/detach,
//! shutdown) are drained at the start of every tick, so all mutation
//! of the game happens inside the tick. A panic inside one game's tick
//! is contained: its sessions get `gameOver {reason: internal_error}`
//! and every other game keeps running.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};

use dustfront_core::config::TICK_DT;
use dustfront_core::game::{Game, GameSetup};
use dustfront_core::input::PlayerInput;
use dustfront_core::units::PlayerId;

use crate::protocol::ServerMessage;
use crate::session::SessionSender;
use crate::GameId;

/// Control messages consumed by a game runner at tick start.
#[derive(Debug)]
pub enum GameControl {
    /// Player input, applied in arrival order per session.
    Input(PlayerId, PlayerInput),
    /// Subscribe a session to snapshots and events.
    Attach(SessionSender),
    /// Unsubscribe a player's session.
    Detach(PlayerId),
    /// Tear the game down.
    Shutdown,
}

/// Cloneable handle to a running game task.
#[derive(Debug, Clone)]
pub struct GameHandle {
    /// Game id.
    pub game_id: GameId,
    /// Control channel into the runner.
    pub control: mpsc::UnboundedSender<GameControl>,
    /// Becomes true when the game ends for any reason.
    pub finished: watch::Receiver<bool>,
    /// Task spawn time, for the lobby sweeper.
    pub created_at: Instant,
    /// Number of currently attached sessions.
    pub attached: Arc<AtomicUsize>,
    /// Players in this game.
    pub players: Vec<PlayerId>,
}

impl GameHandle {
    /// True once the runner has terminated the game.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Number of attached sessions.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.load(Ordering::Relaxed)
    }

    /// Ask the runner to shut the game down.
    pub fn shutdown(&self) {
        let _ = self.control.send(GameControl::Shutdown);
    }
}

/// Spawn the runner task for a new game.
#[must_use]
pub fn spawn_game(game_id: GameId, setup: GameSetup) -> GameHandle {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (finished_tx, finished_rx) = watch::channel(false);
    let attached = Arc::new(AtomicUsize::new(0));
    let players = setup.players.iter().map(|p| p.player).collect();

    let handle = GameHandle {
        game_id: game_id.clone(),
        control: control_tx,
        finished: finished_rx,
        created_at: Instant::now(),
        attached: Arc::clone(&attached),
        players,
    };

    tokio::spawn(run_game(game_id, setup, control_rx, finished_tx, attached));
    handle
}

async fn run_game(
    game_id: GameId,
    setup: GameSetup,
    mut control_rx: mpsc::UnboundedReceiver<GameControl>,
    finished_tx: watch::Sender<bool>,
    attached: Arc<AtomicUsize>,
) {
    let snapshot_interval = setup.config.snapshot_interval_ticks.max(1);
    let mut game = match std::panic::catch_unwind(AssertUnwindSafe(|| Game::new(setup))) {
        Ok(game) => game,
        Err(panic) => {
            tracing::error!(%game_id, panic = panic_message(&panic), "game setup panicked");
            let _ = finished_tx.send(true);
            return;
        }
    };

    let mut sessions: Vec<SessionSender> = Vec::new();
    let mut interval = tokio::time::interval(Duration::from_secs_f32(TICK_DT));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(%game_id, "game started");

    loop {
        interval.tick().await;

        // Drain the control queue: all inputs received before this tick
        // apply at this tick, in per-session arrival order.
        let mut shutdown = false;
        loop {
            match control_rx.try_recv() {
                Ok(GameControl::Input(player, input)) => game.enqueue_input(player, input),
                Ok(GameControl::Attach(sender)) => {
                    sender.send_event(ServerMessage::PlayerId(sender.player));
                    sessions.retain(|s| s.player != sender.player);
                    sessions.push(sender);
                }
                Ok(GameControl::Detach(player)) => {
                    sessions.retain(|s| s.player != player);
                }
                Ok(GameControl::Shutdown) => {
                    shutdown = true;
                    break;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    shutdown = true;
                    break;
                }
            }
        }
        sessions.retain(|s| !s.is_closed());
        attached.store(sessions.len(), Ordering::Relaxed);

        if shutdown {
            tracing::info!(%game_id, "game shut down");
            broadcast(&sessions, |_| ServerMessage::GameOver {
                winning_team: -1,
                reason: "shutdown".to_string(),
            });
            break;
        }

        let output = match std::panic::catch_unwind(AssertUnwindSafe(|| game.tick())) {
            Ok(output) => output,
            Err(panic) => {
                tracing::error!(
                    %game_id,
                    tick = game.tick_count(),
                    panic = panic_message(&panic),
                    "tick panicked, terminating game"
                );
                broadcast(&sessions, |_| ServerMessage::GameOver {
                    winning_team: -1,
                    reason: "internal_error".to_string(),
                });
                break;
            }
        };

        for (player, event) in output.events {
            for session in sessions.iter().filter(|s| s.player == player) {
                session.send_event(ServerMessage::GameEvent(event.clone()));
            }
        }

        if let Some(game_over) = output.game_over {
            tracing::info!(
                %game_id,
                winning_team = game_over.winning_team,
                reason = %game_over.reason,
                "game over"
            );
            broadcast(&sessions, |_| ServerMessage::GameOver {
                winning_team: game_over.winning_team,
                reason: game_over.reason.clone(),
            });
            break;
        }

        // Snapshots reflect post-tick state and may be subsampled
        // relative to the sim rate.
        if game.tick_count() % snapshot_interval == 0 {
            for session in &sessions {
                let snapshot = game.snapshot_for(session.player);
                session.send_snapshot(ServerMessage::GameState(Box::new(snapshot)));
            }
        }
    }

    let _ = finished_tx.send(true);
}

fn broadcast<F>(sessions: &[SessionSender], make: F)
where
    F: Fn(PlayerId) -> ServerMessage,
{
    for session in sessions {
        session.send_event(make(session.player));
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustfront_core::factions::FactionKind;
    use dustfront_core::game::PlayerSlot;
    use dustfront_core::map::{Biome, Density};
    use dustfront_core::prelude::GameConfig;

    fn setup() -> GameSetup {
        GameSetup {
            players: vec![
                PlayerSlot {
                    player: 1,
                    faction: FactionKind::Coalition,
                    team: 1,
                },
                PlayerSlot {
                    player: 2,
                    faction: FactionKind::Syndicate,
                    team: 2,
                },
            ],
            biome: Biome::Dunes,
            density: Density::Low,
            seed: 3,
            config: GameConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_runner_ticks_and_broadcasts_snapshots() {
        let handle = spawn_game("g1".to_string(), setup());
        let (sender, mut receiver) = crate::session::session_channel(1);
        handle.control.send(GameControl::Attach(sender)).unwrap();

        // First frame is our player id.
        let first = tokio::time::timeout(Duration::from_secs(2), receiver.next_message())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert!(matches!(*first, ServerMessage::PlayerId(1)));

        // Then snapshots start flowing.
        let next = tokio::time::timeout(Duration::from_secs(2), receiver.next_message())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert!(matches!(*next, ServerMessage::GameState(_)));

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_notifies_sessions() {
        let mut handle = spawn_game("g2".to_string(), setup());
        let (sender, mut receiver) = crate::session::session_channel(1);
        handle.control.send(GameControl::Attach(sender)).unwrap();

        // Skip the player id frame.
        let _ = tokio::time::timeout(Duration::from_secs(2), receiver.next_message()).await;

        handle.shutdown();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let msg = tokio::time::timeout_at(deadline, receiver.next_message())
                .await
                .expect("timed out waiting for shutdown notice")
                .expect("channel closed");
            if let ServerMessage::GameOver { reason, .. } = &*msg {
                assert_eq!(reason, "shutdown");
                break;
            }
        }

        let _ = tokio::time::timeout(Duration::from_secs(2), handle.finished.changed()).await;
        assert!(handle.is_finished());
    }
}
