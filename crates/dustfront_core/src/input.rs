//! Inbound player input: the `rtsInput` wire shape.
//!
//! Every field is optional; unknown fields are ignored by serde's
//! default behavior and invalid orders are dropped (with a warning log)
//! when the game applies the batch.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::research_data::ResearchId;
use crate::math::Vec2;
use crate::targets::EntityId;
use crate::units::{AiStance, UnitKind};

/// A 2D point on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePoint {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl From<WirePoint> for Vec2 {
    fn from(p: WirePoint) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for WirePoint {
    fn from(v: Vec2) -> Self {
        WirePoint { x: v.x, y: v.y }
    }
}

/// One `rtsInput` message from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerInput {
    /// Replace the sender's unit selection.
    pub select_units: Option<Vec<EntityId>>,
    /// Order selected units to move.
    pub move_order: Option<WirePoint>,
    /// Order selected units to attack-move.
    pub attack_move_order: Option<WirePoint>,
    /// Order selected units to force-fire at the ground.
    pub force_attack_order: Option<WirePoint>,
    /// Order selected units to attack a unit.
    pub attack_unit_order: Option<EntityId>,
    /// Order selected units to attack a building.
    pub attack_building_order: Option<EntityId>,
    /// Order selected units to attack a wall segment.
    pub attack_wall_segment_order: Option<EntityId>,
    /// Order selected workers to harvest an obstacle.
    pub harvest_order: Option<EntityId>,
    /// Order selected miners to mine an obstacle.
    pub mine_order: Option<EntityId>,
    /// Order selected workers to construct a building site.
    pub construct_order: Option<EntityId>,
    /// Order selected infantry to garrison a bunker.
    pub garrison_order: Option<EntityId>,
    /// Ungarrison from a bunker.
    pub ungarrison_building_id: Option<EntityId>,
    /// Ungarrison everything (with `ungarrison_building_id`).
    pub ungarrison_all: Option<bool>,
    /// Place a new building.
    pub build_order: Option<BuildingKind>,
    /// Placement location for `build_order`.
    pub build_location: Option<WirePoint>,
    /// Queue unit production.
    pub produce_unit_order: Option<UnitKind>,
    /// Producing building for `produce_unit_order`.
    pub produce_building_id: Option<EntityId>,
    /// Set a building's rally point.
    pub set_rally_building_id: Option<EntityId>,
    /// Rally location for `set_rally_building_id`.
    pub rally_point: Option<WirePoint>,
    /// Start a research project.
    pub start_research_order: Option<ResearchId>,
    /// Lab to research at.
    pub research_building_id: Option<EntityId>,
    /// Cancel the research at a lab.
    pub cancel_research_building_id: Option<EntityId>,
    /// Launch a sortie from a hangar.
    pub sortie_hangar_id: Option<EntityId>,
    /// Sortie strike location.
    pub sortie_target_location: Option<WirePoint>,
    /// Toggle/trigger the selection's special ability.
    pub activate_special_ability: Option<bool>,
    /// Optional target for the special ability.
    pub special_ability_target: Option<WirePoint>,
    /// Set the selection's AI stance.
    pub set_stance: Option<AiStance>,
    /// Append orders instead of replacing the active command.
    pub queue_order: Option<bool>,
}

impl PlayerInput {
    /// True when the message carries no orders at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when the shift-queue flag is set.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queue_order.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"moveOrder":{"x":10.0,"y":20.0},"someFutureField":true}"#;
        let input: PlayerInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.move_order, Some(WirePoint { x: 10.0, y: 20.0 }));
    }

    #[test]
    fn test_empty_input() {
        let input: PlayerInput = serde_json::from_str("{}").unwrap();
        assert!(input.is_empty());
        assert!(!input.is_queued());
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{
            "selectUnits": [1, 2],
            "attackUnitOrder": 9,
            "produceUnitOrder": "TROOPER",
            "produceBuildingId": 4,
            "queueOrder": true
        }"#;
        let input: PlayerInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.select_units, Some(vec![1, 2]));
        assert_eq!(input.attack_unit_order, Some(9));
        assert_eq!(input.produce_unit_order, Some(UnitKind::Trooper));
        assert!(input.is_queued());
    }
}
