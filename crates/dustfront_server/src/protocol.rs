//! Wire protocol between sessions and the server.
//!
//! Messages are JSON text frames. Inbound frames are an `rtsInput`
//! object with every field optional (plus a `ping` heartbeat flag);
//! outbound frames are externally tagged by message kind.

use serde::{Deserialize, Serialize};

use dustfront_core::events::GameEvent;
use dustfront_core::input::PlayerInput;
use dustfront_core::snapshot::GameStateSnapshot;
use dustfront_core::units::PlayerId;

/// One inbound frame from a client.
///
/// Unknown fields are ignored; a frame can carry both a heartbeat and
/// orders, though clients normally send one or the other.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientMessage {
    /// Heartbeat request; answered with `pong`.
    pub ping: Option<bool>,
    /// Orders carried by this frame.
    #[serde(flatten)]
    pub input: PlayerInput,
}

impl ClientMessage {
    /// True when this frame asks for a heartbeat reply.
    #[must_use]
    pub fn wants_pong(&self) -> bool {
        self.ping.unwrap_or(false)
    }
}

/// One outbound frame to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// The player id bound to this session, sent once after connect.
    PlayerId(PlayerId),
    /// Full world snapshot.
    GameState(Box<GameStateSnapshot>),
    /// Terminal result.
    #[serde(rename_all = "camelCase")]
    GameOver {
        /// Winning team, or -1 for a draw.
        winning_team: i32,
        /// Reason tag.
        reason: String,
    },
    /// Player-directed notification.
    GameEvent(GameEvent),
    /// Heartbeat reply.
    Pong,
}

impl ServerMessage {
    /// Serialize to a JSON text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode server message");
            "{}".to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_frame_parses() {
        let json = r#"{"moveOrder":{"x":1.0,"y":2.0}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.wants_pong());
        assert!(msg.input.move_order.is_some());
    }

    #[test]
    fn test_ping_frame() {
        let msg: ClientMessage = serde_json::from_str(r#"{"ping":true}"#).unwrap();
        assert!(msg.wants_pong());
        assert!(msg.input.is_empty());
    }

    #[test]
    fn test_outbound_tagging() {
        let json = ServerMessage::PlayerId(7).to_json();
        assert_eq!(json, r#"{"playerId":7}"#);

        let json = ServerMessage::Pong.to_json();
        assert_eq!(json, r#""pong""#);

        let json = ServerMessage::GameOver {
            winning_team: 2,
            reason: "elimination".to_string(),
        }
        .to_json();
        assert!(json.contains(r#""winningTeam":2"#));
        assert!(json.contains(r#""gameOver""#));
    }
}
