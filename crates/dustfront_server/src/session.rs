//! Per-connection session plumbing.
//!
//! The simulation tick must never block on a slow client. Snapshots go
//! through a `watch` channel, which is latest-wins by construction: a
//! client that cannot keep up simply skips intermediate snapshots.
//! Discrete messages (events, game-over, pong) go through a small
//! bounded queue; overflow drops the message with a warning rather
//! than back-pressuring the game.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use dustfront_core::units::PlayerId;

use crate::protocol::ServerMessage;

/// Capacity of the discrete-message queue.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Sender half held by the game runner.
#[derive(Debug, Clone)]
pub struct SessionSender {
    /// The session's player.
    pub player: PlayerId,
    snapshot_tx: watch::Sender<Option<Arc<ServerMessage>>>,
    event_tx: mpsc::Sender<ServerMessage>,
}

impl SessionSender {
    /// Publish a snapshot (latest wins).
    pub fn send_snapshot(&self, snapshot: ServerMessage) {
        let _ = self.snapshot_tx.send(Some(Arc::new(snapshot)));
    }

    /// Queue a discrete message, dropping it on overflow.
    pub fn send_event(&self, message: ServerMessage) {
        if let Err(e) = self.event_tx.try_send(message) {
            tracing::warn!(player = self.player, error = %e, "session outbox full, dropping message");
        }
    }

    /// True once the receiving side hung up.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Receiver half held by the socket writer task.
pub struct SessionReceiver {
    snapshot_rx: watch::Receiver<Option<Arc<ServerMessage>>>,
    event_rx: mpsc::Receiver<ServerMessage>,
}

impl SessionReceiver {
    /// Wait for the next outbound message, preferring queued discrete
    /// messages over snapshots. Returns `None` when the sender is gone.
    pub async fn next_message(&mut self) -> Option<Arc<ServerMessage>> {
        loop {
            tokio::select! {
                biased;
                event = self.event_rx.recv() => {
                    return event.map(Arc::new);
                }
                changed = self.snapshot_rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    let latest = self.snapshot_rx.borrow_and_update().clone();
                    if let Some(snapshot) = latest {
                        return Some(snapshot);
                    }
                    // Initial empty value; keep waiting.
                }
            }
        }
    }
}

/// Create a connected sender/receiver pair for one session.
#[must_use]
pub fn session_channel(player: PlayerId) -> (SessionSender, SessionReceiver) {
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    (
        SessionSender {
            player,
            snapshot_tx,
            event_tx,
        },
        SessionReceiver {
            snapshot_rx,
            event_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = session_channel(1);
        tx.send_event(ServerMessage::PlayerId(1));
        tx.send_event(ServerMessage::Pong);

        let first = rx.next_message().await.unwrap();
        assert!(matches!(*first, ServerMessage::PlayerId(1)));
        let second = rx.next_message().await.unwrap();
        assert!(matches!(*second, ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_snapshots_are_latest_wins() {
        let (tx, mut rx) = session_channel(1);
        tx.send_snapshot(ServerMessage::GameOver {
            winning_team: 1,
            reason: "stale".to_string(),
        });
        tx.send_snapshot(ServerMessage::GameOver {
            winning_team: 2,
            reason: "fresh".to_string(),
        });

        let latest = rx.next_message().await.unwrap();
        match &*latest {
            ServerMessage::GameOver { reason, .. } => assert_eq!(reason, "fresh"),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overflow_drops_instead_of_blocking() {
        let (tx, _rx) = session_channel(1);
        // Push well past capacity; none of these may block or panic.
        for _ in 0..(EVENT_QUEUE_CAPACITY * 2) {
            tx.send_event(ServerMessage::Pong);
        }
    }
}
