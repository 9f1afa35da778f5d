//! Player-facing game events.

use serde::{Deserialize, Serialize};

/// Event category, used by clients for styling and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Neutral information.
    Info,
    /// Rejected actions and other player mistakes.
    Warning,
    /// Combat notifications.
    Combat,
    /// Economy notifications.
    Economy,
}

/// A transient message pushed to one player's client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    /// Display text.
    pub message: String,
    /// Category.
    pub category: EventCategory,
    /// Optional display color hint (hex string).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Optional display duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_duration: Option<u32>,
}

impl GameEvent {
    /// An informational event.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: EventCategory::Info,
            color: None,
            display_duration: None,
        }
    }

    /// A warning event (rejected action).
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: EventCategory::Warning,
            color: None,
            display_duration: None,
        }
    }

    /// A combat event.
    #[must_use]
    pub fn combat(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: EventCategory::Combat,
            color: None,
            display_duration: None,
        }
    }

    /// An economy event.
    #[must_use]
    pub fn economy(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: EventCategory::Economy,
            color: None,
            display_duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_format() {
        let event = GameEvent::warning("upkeep cap reached");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "warning");
        assert_eq!(json["message"], "upkeep cap reached");
        assert!(json.get("color").is_none());
    }
}
